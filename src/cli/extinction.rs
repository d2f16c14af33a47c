//! # extinction 子命令 CLI 定义
//!
//! 按大气层温度计算消光系数，输出 CSV。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/extinction.rs`

use super::common::{DatabaseArgs, LineShapeArgs, SpectrumArgs};
use clap::Args;
use std::path::PathBuf;

/// extinction 子命令参数
#[derive(Args, Debug)]
pub struct ExtinctionArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub spectrum: SpectrumArgs,

    #[command(flatten)]
    pub line_shape: LineShapeArgs,

    /// Atmospheric profile
    #[arg(long)]
    pub atmosphere: PathBuf,

    /// Layer index (0 = top of the profile file)
    #[arg(long, default_value_t = 0, conflicts_with = "all_layers")]
    pub layer: usize,

    /// Compute the total extinction of every layer instead of one layer per species
    #[arg(long, default_value_t = false)]
    pub all_layers: bool,

    /// CSV output file
    #[arg(short, long, default_value = "extinction.csv")]
    pub output: PathBuf,

    /// Number of parallel workers (0 = all CPUs)
    #[arg(short = 'j', long, default_value_t = 1)]
    pub ncpu: usize,
}
