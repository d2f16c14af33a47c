//! # 数据模型模块
//!
//! 定义谱线记录、同位素信息、大气剖面和分子物性数据。
//!
//! ## 依赖关系
//! - 被 `database/`, `extinction/` 和 `commands/` 使用
//! - 子模块: line, atmosphere, molecules

pub mod atmosphere;
pub mod line;
pub mod molecules;

pub use atmosphere::{Atmosphere, Species};
pub use line::{IsotopeInfo, LineList, LineRecord};
