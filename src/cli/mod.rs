//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `opacity`: 构建并写出不透明度表
//! - `extinction`: 单层（或全部层）消光
//! - `lines`: 查询数据库窗口内的谱线
//! - `pf`: 显示数据库的配分函数
//! - `inspect`: 查看已写出的不透明度表
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: common, opacity, extinction, lines, pf, inspect

pub mod common;
pub mod extinction;
pub mod inspect;
pub mod lines;
pub mod opacity;
pub mod pf;

use clap::{Parser, Subcommand};

/// exline - 逐线消光系数与不透明度表
#[derive(Parser)]
#[command(name = "exline")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Line-by-line extinction coefficients and opacity tables from line-transition databases",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity: 0 silent, 1 stages, 2 progress, 3 per-record details
    #[arg(short, long, global = true, default_value_t = 2)]
    pub verbosity: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Build an opacity table over a temperature grid and the atmosphere's pressure layers
    Opacity(opacity::OpacityArgs),

    /// Compute extinction coefficients of an atmospheric layer (or every layer)
    Extinction(extinction::ExtinctionArgs),

    /// List the transitions of a database inside a wavenumber window
    Lines(lines::LinesArgs),

    /// Show the partition function of a database at given temperatures
    Pf(pf::PfArgs),

    /// Show the axes and contents of a persisted opacity table
    Inspect(inspect::InspectArgs),
}
