//! # 批量处理模块
//!
//! ## 功能
//! - 收集数据库文件列表（文件/目录 + glob 模式）
//! - 固定大小的并行工作池
//!
//! ## 依赖关系
//! - 被 `extinction/` 与 `commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::WorkerPool;
