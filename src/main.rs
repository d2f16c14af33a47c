//! # exline - 逐线消光系数与不透明度表
//!
//! 从按波数排序的谱线数据库中读取谱线，计算 Voigt 展宽的消光系数，
//! 在温度 × 压力网格上构建不透明度表。
//!
//! ## 子命令
//! - `opacity`    - 构建并写出不透明度表
//! - `extinction` - 单层各物种消光 / 全部层总消光
//! - `lines`      - 查询数据库窗口内的谱线
//! - `pf`         - 显示数据库的配分函数
//! - `inspect`    - 查看已写出的不透明度表
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── extinction/ (构建流程、计算核心、截面表)
//!   │     ├── database/   (数据库驱动与区间查询)
//!   │     ├── partition/  (配分函数)
//!   │     ├── broadening/ (谱线宽度与线型缓存)
//!   │     ├── batch/      (文件收集与工作池)
//!   │     └── models/     (数据模型)
//!   ├── utils/      (日志、输出、进度条)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod broadening;
mod cli;
mod commands;
mod constants;
mod database;
mod error;
mod extinction;
mod models;
mod partition;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
