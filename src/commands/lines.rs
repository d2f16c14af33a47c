//! # lines 命令实现
//!
//! 在每个数据库中查询波数窗口，打印概要与最强谱线，可选导出 CSV。
//!
//! ## 依赖关系
//! - 使用 `cli/lines.rs` 定义的参数
//! - 使用 `database/` 的区间查询
//! - 使用 `utils/progress.rs` 进度条作为读取观察者
//! - 使用 `tabled` 打印表格，`serde` + `csv` 导出

use super::open_databases;
use crate::cli::lines::LinesArgs;
use crate::database::{LineDatabase, RangeQuery};
use crate::error::{ExlineError, Result};
use crate::models::LineRecord;
use crate::utils::{output, progress, Log};

use serde::Serialize;
use std::path::Path;
use tabled::{Table, Tabled};

/// 数据库概要行
#[derive(Debug, Clone, Tabled)]
struct SummaryRow {
    #[tabled(rename = "Database")]
    database: String,
    #[tabled(rename = "Coverage (cm-1)")]
    coverage: String,
    #[tabled(rename = "Records")]
    records: String,
    #[tabled(rename = "In window")]
    selected: usize,
}

/// 谱线表格行
#[derive(Debug, Clone, Tabled)]
struct LineRow {
    #[tabled(rename = "Database")]
    database: String,
    #[tabled(rename = "Wavenumber (cm-1)")]
    wavenumber: String,
    #[tabled(rename = "Elow (cm-1)")]
    elow: String,
    #[tabled(rename = "gf")]
    gf: String,
    #[tabled(rename = "Isotope")]
    isotope: String,
}

/// CSV 导出记录
#[derive(Debug, Serialize)]
struct ExportRecord<'a> {
    database: &'a str,
    molecule: &'a str,
    isotope: &'a str,
    wavenumber_cm1: f64,
    elow_cm1: f64,
    gf: f64,
}

/// 执行 lines 命令
pub fn execute(args: LinesArgs, log: Log) -> Result<()> {
    output::print_header("Querying Line Databases");

    let mut databases = open_databases(&args.database)?;
    let mut summary = Vec::with_capacity(databases.len());
    let mut selected: Vec<(usize, Vec<LineRecord>)> = Vec::new();

    for (d, db) in databases.iter_mut().enumerate() {
        let (lo, hi) = db.coverage()?;
        let records = read_with_progress(db, args.wn_min, args.wn_max, &log)?;
        summary.push(SummaryRow {
            database: db.name().to_string(),
            coverage: format!("{:.3} -- {:.3}", lo, hi),
            records: db.len().to_string(),
            selected: records.len(),
        });
        selected.push((d, records));
    }

    println!("{}", Table::new(&summary));

    let mut strongest: Vec<LineRow> = Vec::new();
    for (d, records) in &selected {
        let db = &databases[*d];
        let mut order: Vec<&LineRecord> = records.iter().collect();
        order.sort_by(|a, b| b.gf.total_cmp(&a.gf));
        strongest.extend(order.into_iter().take(args.top_n).map(|rec| LineRow {
            database: db.name().to_string(),
            wavenumber: format!("{:.6}", rec.wavenumber),
            elow: format!("{:.4}", rec.elow),
            gf: format!("{:.4e}", rec.gf),
            isotope: isotope_name(db, rec).to_string(),
        }));
    }
    if !strongest.is_empty() {
        output::print_header(&format!("Strongest {} Lines per Database (by gf)", args.top_n));
        println!("{}", Table::new(&strongest));
    }

    if let Some(path) = &args.output {
        let n = export_csv(path, &databases, &selected)?;
        output::print_success(&format!("{} records saved to '{}'", n, path.display()));
    }
    Ok(())
}

fn isotope_name<'a>(db: &'a LineDatabase, rec: &LineRecord) -> &'a str {
    db.isotopes()
        .get(rec.isotope)
        .map(|iso| iso.name.as_str())
        .unwrap_or("?")
}

/// 查询窗口并读取；交互显示进度条，不覆盖时只给出警告
fn read_with_progress(
    db: &mut LineDatabase,
    wn_min: f64,
    wn_max: f64,
    log: &Log,
) -> Result<Vec<LineRecord>> {
    match db.query_range(wn_min, wn_max)? {
        RangeQuery::Covered(range) => {
            let pb = progress::create_progress_bar(range.len() as u64, db.name());
            let records = db.read_records(range, &pb)?;
            pb.finish_and_clear();
            log.msg(
                &format!("Read {} transitions from {}.", records.len(), db.name()),
                2,
            );
            Ok(records)
        }
        RangeQuery::NotCovered(warning) => {
            log.warning(&warning.to_string());
            Ok(Vec::new())
        }
    }
}

fn export_csv(
    path: &Path,
    databases: &[LineDatabase],
    selected: &[(usize, Vec<LineRecord>)],
) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut n = 0;
    for (d, records) in selected {
        let db = &databases[*d];
        for rec in records {
            wtr.serialize(ExportRecord {
                database: db.name(),
                molecule: db.molecule(),
                isotope: isotope_name(db, rec),
                wavenumber_cm1: rec.wavenumber,
                elow_cm1: rec.elow,
                gf: rec.gf,
            })?;
            n += 1;
        }
    }
    wtr.flush().map_err(|e| ExlineError::write(path, e))?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repack::{write_repack, RepackRecord};
    use crate::database::tests::isotope_table;
    use crate::database::{DatabaseFormat, DatabaseSpec};
    use crate::partition::PfSource;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_export_csv_with_isotope_names() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("CO_hitran_small.bin");
        let records: Vec<RepackRecord> = [(2000.5, 26), (2001.5, 36), (2002.5, 26)]
            .iter()
            .map(|&(wavenumber, isotope)| RepackRecord {
                wavenumber,
                elow: 10.0,
                gf: 1e-3,
                isotope,
            })
            .collect();
        write_repack(&db_path, &records).unwrap();
        let spec = DatabaseSpec::new(db_path, DatabaseFormat::Repack, PfSource::Builtin);
        let mut db = LineDatabase::open(&spec, Some(&isotope_table())).unwrap();

        let selected = read_with_progress(&mut db, 2001.0, 2003.0, &Log::silent()).unwrap();
        assert_eq!(selected.len(), 2);

        let csv_path = dir.path().join("lines.csv");
        let n = export_csv(&csv_path, std::slice::from_ref(&db), &[(0, selected)]).unwrap();
        assert_eq!(n, 2);
        let content = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "database,molecule,isotope,wavenumber_cm1,elow_cm1,gf");
        assert!(lines[1].starts_with("repack hitran CO,CO,36,2001.5,"));
    }

    #[test]
    fn test_window_outside_database_reads_nothing() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("CO_hitran_small.bin");
        write_repack(
            &db_path,
            &[RepackRecord {
                wavenumber: 2000.5,
                elow: 0.0,
                gf: 1e-3,
                isotope: 26,
            }],
        )
        .unwrap();
        let spec = DatabaseSpec::new(db_path, DatabaseFormat::Repack, PfSource::Builtin);
        let mut db = LineDatabase::open(&spec, Some(&isotope_table())).unwrap();
        let (log, buffer) = Log::memory(2);
        assert!(read_with_progress(&mut db, 100.0, 200.0, &log).unwrap().is_empty());
        assert!(buffer.lock().unwrap()[0].starts_with("[WARN]"));
    }
}
