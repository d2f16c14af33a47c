//! # inspect 命令实现
//!
//! 读取不透明度表，打印坐标轴和各物种的数值概要，可导出单个单元。
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的参数
//! - 使用 `extinction/grid.rs` 读取文件
//! - 使用 `tabled` 打印表格，`csv` 导出
//! - 使用 `utils/progress.rs` 的 spinner

use crate::cli::inspect::InspectArgs;
use crate::constants::BAR;
use crate::error::{ExlineError, Result};
use crate::extinction::OpacityGrid;
use crate::utils::{output, progress};

use ndarray::Axis;
use std::path::Path;
use tabled::{Table, Tabled};

/// 物种概要行
#[derive(Debug, Clone, Tabled)]
struct SpeciesRow {
    #[tabled(rename = "Species")]
    species: String,
    #[tabled(rename = "Max (cm2/molecule)")]
    max: String,
    #[tabled(rename = "Mean (cm2/molecule)")]
    mean: String,
    #[tabled(rename = "Non-zero (%)")]
    nonzero: String,
}

/// 执行 inspect 命令
pub fn execute(args: InspectArgs) -> Result<()> {
    output::print_header("Opacity Table");

    let spinner = progress::create_spinner("Reading opacity table");
    let grid = OpacityGrid::read(&args.table);
    spinner.finish_and_clear();
    let grid = grid?;
    let (nspec, ntemp, nlayers, nwave) = grid.dims();
    output::print_info(&format!("File: {}", args.table.display()));
    output::print_detail(&axis_summary(&grid), 4);
    output::print_separator();

    println!("{}", Table::new(species_rows(&grid)));

    if let Some(cell) = &args.cell {
        let (itemp, ilayer) = match cell.as_slice() {
            [itemp, ilayer] => (*itemp, *ilayer),
            _ => {
                return Err(ExlineError::InvalidArgument(
                    "--cell expects a temperature index and a layer index".to_string(),
                ))
            }
        };
        if itemp >= ntemp || ilayer >= nlayers {
            return Err(ExlineError::InvalidArgument(format!(
                "Cell ({}, {}) is outside the table ({} temperatures × {} layers)",
                itemp, ilayer, ntemp, nlayers
            )));
        }
        export_cell(&args.output, &grid, itemp, ilayer)?;
        output::print_done(&format!(
            "Cell T={:.1} K, p={:.3e} bar ({} species × {} wavenumbers) saved to '{}'",
            grid.temperature()[itemp],
            grid.pressure()[ilayer] / BAR,
            nspec,
            nwave,
            args.output.display()
        ));
    }
    Ok(())
}

fn axis_summary(grid: &OpacityGrid) -> String {
    let range = |v: &[f64]| match (v.first(), v.last()) {
        (Some(a), Some(b)) => format!("{:.4e} -- {:.4e}", a, b),
        _ => "empty".to_string(),
    };
    let pressure_bar: Vec<f64> = grid.pressure().iter().map(|p| p / BAR).collect();
    format!(
        "Species:     {}\nTemperature: {} samples, {} K\nPressure:    {} layers, {} bar\nWavenumber:  {} samples, {} cm-1",
        grid.species().join(", "),
        grid.temperature().len(),
        range(grid.temperature()),
        pressure_bar.len(),
        range(&pressure_bar),
        grid.wavenumber().len(),
        range(grid.wavenumber()),
    )
}

fn species_rows(grid: &OpacityGrid) -> Vec<SpeciesRow> {
    let coefficients = grid.coefficients();
    grid.species()
        .iter()
        .zip(coefficients.axis_iter(Axis(0)))
        .map(|(name, values)| {
            let n = values.len().max(1) as f64;
            let max = values.iter().copied().fold(0.0f64, f64::max);
            let nonzero = values.iter().filter(|v| **v > 0.0).count() as f64;
            SpeciesRow {
                species: name.clone(),
                max: format!("{:.4e}", max),
                mean: format!("{:.4e}", values.sum() / n),
                nonzero: format!("{:.1}", 100.0 * nonzero / n),
            }
        })
        .collect()
}

fn export_cell(path: &Path, grid: &OpacityGrid, itemp: usize, ilayer: usize) -> Result<()> {
    let cell = grid.cell(itemp, ilayer);
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = vec!["wavenumber_cm-1".to_string()];
    header.extend(grid.species().iter().map(|s| format!("{}_cm2", s)));
    wtr.write_record(&header)?;

    for (j, wn) in grid.wavenumber().iter().enumerate() {
        let mut record = vec![format!("{:.6}", wn)];
        record.extend(cell.column(j).iter().map(|v| format!("{:.6e}", v)));
        wtr.write_record(&record)?;
    }
    wtr.flush().map_err(|e| ExlineError::write(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_grid() -> OpacityGrid {
        let mut grid = OpacityGrid::zeros(
            vec!["H2O".to_string(), "CO".to_string()],
            vec![500.0, 1000.0],
            vec![1.0 * BAR],
            vec![2000.0, 2001.0, 2002.0],
        );
        for (c, cell) in grid.cells_mut().unwrap().into_iter().enumerate() {
            // H2O 的三个点, 然后 CO 的三个点
            cell[1] = 1e-20 * (c + 1) as f64;
            cell[5] = 4e-22;
        }
        grid
    }

    #[test]
    fn test_species_rows() {
        let rows = species_rows(&sample_grid());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].species, "H2O");
        assert_eq!(rows[0].max, "2.0000e-20");
        assert_eq!(rows[0].nonzero, "33.3");
        assert_eq!(rows[1].max, "4.0000e-22");
    }

    #[test]
    fn test_export_cell() {
        let dir = tempdir().unwrap();
        let table = dir.path().join("table.bin");
        sample_grid().write(&table).unwrap();
        let grid = OpacityGrid::read(&table).unwrap();

        let csv_path = dir.path().join("cell.csv");
        export_cell(&csv_path, &grid, 1, 0).unwrap();
        let content = fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "wavenumber_cm-1,H2O_cm2,CO_cm2");
        assert_eq!(lines[2], "2001.000000,2.000000e-20,0.000000e0");
        assert_eq!(lines[3], "2002.000000,0.000000e0,4.000000e-22");
    }

    #[test]
    fn test_axis_summary_reports_bar() {
        let summary = axis_summary(&sample_grid());
        assert!(summary.contains("H2O, CO"));
        assert!(summary.contains("1 layers, 1.0000e0 -- 1.0000e0 bar"));
    }
}
