//! # 消光计算模块
//!
//! ## 功能
//! - 构建配置（温度网格、光谱网格、线型参数）
//! - 单元消光核心
//! - 四维截面表及其二进制格式
//! - 类型状态的构建流程（验证 → 计算 → 写出）
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 使用 `database/`, `partition/`, `broadening/`, `batch/`

pub mod builder;
pub mod config;
pub mod grid;
pub mod kernel;

pub use builder::OpacityBuilder;
pub use config::{OpacityConfig, SpectralGrid};
pub use grid::OpacityGrid;
