//! # 工具函数模块
//!
//! 提供美化输出、进度条、日志上下文等工具。
//!
//! ## 依赖关系
//! - 被 `commands/`, `database/`, `extinction/` 模块使用
//! - 子模块: output, progress, log

pub mod log;
pub mod output;
pub mod progress;

pub use log::Log;
