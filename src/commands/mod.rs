//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑，并把 CLI 参数组转换为库配置。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `database/`, `extinction/`, `batch/`, `utils/`
//! - 子模块: opacity, extinction, lines, pf, inspect

pub mod extinction;
pub mod inspect;
pub mod lines;
pub mod opacity;
pub mod pf;

use crate::batch::FileCollector;
use crate::broadening::LineShapeConfig;
use crate::cli::common::{DatabaseArgs, LineShapeArgs, SpectrumArgs};
use crate::cli::{Cli, Commands};
use crate::database::isotopes::IsotopeTable;
use crate::database::{DatabaseFormat, DatabaseSpec, LineDatabase};
use crate::error::Result;
use crate::extinction::SpectralGrid;
use crate::partition::PfSource;
use crate::utils::Log;

/// 执行命令
pub fn run(cli: Cli) -> Result<()> {
    let log = Log::terminal(cli.verbosity);
    match cli.command {
        Commands::Opacity(args) => opacity::execute(args, log),
        Commands::Extinction(args) => extinction::execute(args, log),
        Commands::Lines(args) => lines::execute(args, log),
        Commands::Pf(args) => pf::execute(args, log),
        Commands::Inspect(args) => inspect::execute(args),
    }
}

/// 展开数据库输入（目录按模式收集）为打开参数
pub(crate) fn database_specs(args: &DatabaseArgs) -> Result<Vec<DatabaseSpec>> {
    let format = DatabaseFormat::parse(&args.format)?;
    let pf = PfSource::parse(&args.pf);

    let mut specs = Vec::new();
    for input in &args.databases {
        let mut collector = FileCollector::new(input.clone()).recursive(args.recursive);
        if let Some(pattern) = &args.pattern {
            collector = collector.with_pattern(pattern)?;
        }
        for path in collector.collect()? {
            let mut spec = DatabaseSpec::new(path, format.clone(), pf.clone());
            spec.molecule = args.molecule.clone();
            specs.push(spec);
        }
    }
    Ok(specs)
}

/// 打开所有数据库（用于只读查询的子命令）
pub(crate) fn open_databases(args: &DatabaseArgs) -> Result<Vec<LineDatabase>> {
    let table = args.isotopes.as_deref().map(IsotopeTable::read).transpose()?;
    database_specs(args)?
        .iter()
        .map(|spec| LineDatabase::open(spec, table.as_ref()))
        .collect()
}

pub(crate) fn spectral_grid(args: &SpectrumArgs) -> SpectralGrid {
    SpectralGrid::new(args.wn_min, args.wn_max, args.wn_step, args.oversampling)
}

pub(crate) fn line_shape(args: &LineShapeArgs) -> LineShapeConfig {
    LineShapeConfig {
        extent: args.extent,
        cutoff: if args.no_cutoff { None } else { Some(args.cutoff) },
        ndop: args.ndop,
        nlor: args.nlor,
        dlratio: args.dlratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_database_directory_is_expanded_by_pattern() {
        let dir = tempdir().unwrap();
        for name in ["CO_hitran_a.bin", "H2O_exomol_b.bin", "readme.txt"] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let dir_arg = dir.path().to_string_lossy().to_string();
        let cli = Cli::parse_from([
            "exline", "lines", "--db", &dir_arg, "--pattern", "*.bin", "--wn-min", "1", "--wn-max", "2",
        ]);
        let Commands::Lines(args) = cli.command else {
            panic!("expected lines subcommand");
        };
        let specs = database_specs(&args.database).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(specs[0].path.ends_with("CO_hitran_a.bin"));
        assert_eq!(specs[1].pf, PfSource::Builtin);
    }

    #[test]
    fn test_line_shape_flags() {
        let cli = Cli::parse_from([
            "exline", "opacity", "--db", "x.bin", "--atmosphere", "atm.dat", "--no-cutoff", "--ndop", "60",
        ]);
        let Commands::Opacity(args) = cli.command else {
            panic!("expected opacity subcommand");
        };
        let shape = line_shape(&args.line_shape);
        assert_eq!(shape.cutoff, None);
        assert_eq!(shape.ndop, 60);
        assert_eq!(shape.nlor, 40);
        assert_eq!(cli.verbosity, 2);
        assert_eq!(spectral_grid(&args.spectrum), SpectralGrid::default());
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let cli = Cli::parse_from(["exline", "pf", "--db", "x.bin", "--format", "hdf5"]);
        let Commands::Pf(args) = cli.command else {
            panic!("expected pf subcommand");
        };
        assert!(database_specs(&args.database).is_err());
    }
}
