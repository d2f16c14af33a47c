//! # lines 子命令 CLI 定义
//!
//! 查询数据库在波数窗口内的谱线。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/lines.rs`

use super::common::DatabaseArgs;
use clap::Args;
use std::path::PathBuf;

/// lines 子命令参数
#[derive(Args, Debug)]
pub struct LinesArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Lower wavenumber boundary (cm-1)
    #[arg(long)]
    pub wn_min: f64,

    /// Upper wavenumber boundary (cm-1)
    #[arg(long)]
    pub wn_max: f64,

    /// Number of strongest lines to print per database
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Export every record in the window to this CSV file
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
