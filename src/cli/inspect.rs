//! # inspect 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/inspect.rs`

use clap::Args;
use std::path::PathBuf;

/// inspect 子命令参数
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Opacity-table file written by `exline opacity`
    pub table: PathBuf,

    /// Export one cell (temperature index, layer index) to CSV
    #[arg(long, num_args = 2, value_names = ["ITEMP", "ILAYER"])]
    pub cell: Option<Vec<usize>>,

    /// CSV output file for `--cell`
    #[arg(short, long, default_value = "opacity_cell.csv")]
    pub output: PathBuf,
}
