//! # opacity 子命令 CLI 定义
//!
//! 在温度网格 × 大气压力层上构建截面表并写出。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/opacity.rs`

use super::common::{DatabaseArgs, LineShapeArgs, SpectrumArgs};
use clap::Args;
use std::path::PathBuf;

/// opacity 子命令参数
#[derive(Args, Debug)]
pub struct OpacityArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub spectrum: SpectrumArgs,

    #[command(flatten)]
    pub line_shape: LineShapeArgs,

    /// Atmospheric profile providing the pressure layers and species
    #[arg(long)]
    pub atmosphere: PathBuf,

    /// Output opacity-table file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Lower temperature boundary (K)
    #[arg(long)]
    pub tmin: Option<f64>,

    /// Upper temperature boundary (K)
    #[arg(long)]
    pub tmax: Option<f64>,

    /// Temperature sampling step (K)
    #[arg(long)]
    pub tstep: Option<f64>,

    /// Number of parallel workers (0 = all CPUs)
    #[arg(short = 'j', long, default_value_t = 1)]
    pub ncpu: usize,
}
