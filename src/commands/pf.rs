//! # pf 命令实现
//!
//! 按数据库的配分函数来源构造表格并在给定温度上插值。
//!
//! ## 依赖关系
//! - 使用 `cli/pf.rs` 定义的参数
//! - 使用 `database/` 与 `partition/`
//! - 使用 `tabled` 打印表格

use super::open_databases;
use crate::cli::pf::PfArgs;
use crate::error::Result;
use crate::partition::PartitionFunctionTable;
use crate::utils::{output, Log};

use tabled::builder::Builder;

/// 执行 pf 命令
pub fn execute(args: PfArgs, log: Log) -> Result<()> {
    output::print_header("Partition Functions");

    for db in open_databases(&args.database)? {
        let table = db.partition_function()?;
        let (tmin, tmax) = table.coverage(0);
        output::print_info(&format!(
            "{} (source: {}, {} isotopes, {:.0}--{:.0} K)",
            db.name(),
            db.pf_source(),
            table.len(),
            tmin,
            tmax
        ));
        match render(&table, &args.temperature) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => log.warning(&e.to_string()),
        }
    }
    Ok(())
}

/// 每个同位素一行、每个温度一列
fn render(table: &PartitionFunctionTable, temperature: &[f64]) -> Result<String> {
    let mut builder = Builder::default();
    let mut header = vec!["Isotope".to_string()];
    header.extend(temperature.iter().map(|t| format!("{:.1} K", t)));
    builder.push_record(header);

    for (i, name) in table.isotopes().iter().enumerate() {
        let mut row = vec![name.clone()];
        for &t in temperature {
            row.push(format!("{:.5e}", table.interpolate(i, t)?));
        }
        builder.push_record(row);
    }
    Ok(builder.build().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExlineError;
    use crate::partition::{builtin, temperature_grid};

    fn co_table() -> PartitionFunctionTable {
        let temps = temperature_grid(builtin::TMIN, builtin::TMAX, builtin::TSTEP);
        let values = builtin::tabulate(5, &[27.994915, 28.998270], &temps).unwrap();
        PartitionFunctionTable::new("CO", vec!["26".into(), "36".into()], temps, values).unwrap()
    }

    #[test]
    fn test_render_lists_isotopes_and_temperatures() {
        let rendered = render(&co_table(), &[296.0, 1000.0]).unwrap();
        assert!(rendered.contains("296.0 K"));
        assert!(rendered.contains("1000.0 K"));
        assert!(rendered.contains("26"));
        assert!(rendered.contains("36"));
    }

    #[test]
    fn test_render_outside_range_fails() {
        let err = render(&co_table(), &[5000.0]).unwrap_err();
        assert!(matches!(err, ExlineError::TemperatureOutOfRange { .. }));
        assert!(err.to_string().contains("CO isotope '26'"));
    }
}
