//! # extinction 命令实现
//!
//! 单层模式输出各物种的消光（每物种一列），
//! 全层模式输出每层的总消光（每层一列）。
//!
//! ## 依赖关系
//! - 使用 `cli/extinction.rs` 定义的参数
//! - 使用 `extinction/builder.rs`
//! - 使用 `csv` 写出结果

use super::{database_specs, line_shape, spectral_grid};
use crate::cli::extinction::ExtinctionArgs;
use crate::constants::BAR;
use crate::error::{ExlineError, Result};
use crate::extinction::{OpacityBuilder, OpacityConfig};
use crate::models::atmosphere::read_atmosphere;
use crate::utils::{output, Log};

use ndarray::ArrayView2;
use std::path::Path;

/// 执行 extinction 命令
pub fn execute(args: ExtinctionArgs, log: Log) -> Result<()> {
    output::print_header("Computing Extinction Coefficients");

    let atmosphere = read_atmosphere(&args.atmosphere)?;
    let config = OpacityConfig {
        databases: database_specs(&args.database)?,
        isotopes: args.database.isotopes.clone(),
        spectrum: spectral_grid(&args.spectrum),
        line_shape: line_shape(&args.line_shape),
        ethresh: args.line_shape.ethresh,
        ncpu: args.ncpu,
        ..OpacityConfig::default()
    };
    let wavenumber = config.spectrum.wavenumbers();
    let mut build = OpacityBuilder::new(config, atmosphere, log).validate_atmosphere()?;

    if args.all_layers {
        let extinction = build.evaluate_atmosphere()?;
        let labels: Vec<String> = build
            .atmosphere()
            .pressure
            .iter()
            .map(|p| format!("p={:.3e}bar", p / BAR))
            .collect();
        write_columns(&args.output, &wavenumber, &labels, extinction.view())?;
        output::print_done(&format!(
            "Extinction of {} layers saved to '{}'",
            labels.len(),
            args.output.display()
        ));
    } else {
        let (ec, labels) = build.get_ec(args.layer)?;
        let atm = build.atmosphere();
        output::print_info(&format!(
            "Layer {}: T = {:.1} K, p = {:.3e} bar",
            args.layer,
            atm.temperature[args.layer],
            atm.pressure[args.layer] / BAR
        ));
        for (label, row) in labels.iter().zip(ec.rows()) {
            let peak = row.iter().copied().fold(0.0f64, f64::max);
            output::print_detail(&format!("{:<8} peak extinction {:.4e} cm-1", label, peak), 4);
        }
        write_columns(&args.output, &wavenumber, &labels, ec.view())?;
        output::print_done(&format!(
            "Extinction of {} species saved to '{}'",
            labels.len(),
            args.output.display()
        ));
    }
    Ok(())
}

/// 写出 `wavenumber` 列加上 `values` 的每一行作为一列
fn write_columns(
    path: &Path,
    wavenumber: &[f64],
    labels: &[String],
    values: ArrayView2<f64>,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["wavenumber_cm-1".to_string()];
    header.extend(labels.iter().map(|l| format!("{}_cm-1", l)));
    wtr.write_record(&header)?;

    for (j, wn) in wavenumber.iter().enumerate() {
        let mut record = vec![format!("{:.6}", wn)];
        record.extend(values.column(j).iter().map(|v| format!("{:.6e}", v)));
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| ExlineError::write(path, e))?;
    Ok(())
}
