//! # pf 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/pf.rs`

use super::common::DatabaseArgs;
use clap::Args;

/// pf 子命令参数
#[derive(Args, Debug)]
pub struct PfArgs {
    #[command(flatten)]
    pub database: DatabaseArgs,

    /// Temperatures to evaluate (K), comma separated
    #[arg(long, value_delimiter = ',', default_values_t = vec![296.0, 1000.0, 2000.0])]
    pub temperature: Vec<f64>,
}
