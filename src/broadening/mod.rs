//! # 谱线展宽模块
//!
//! ## 子模块
//! - `widths`: Doppler / Lorentz / Voigt 半宽及其上下界估计
//! - `voigt`: Humlíček W4 近似的归一化 Voigt 线型
//! - `cache`: 按宽度网格量化的线型缓存
//!
//! ## 依赖关系
//! - 被 `extinction/` 使用
//! - 使用 `constants.rs`

pub mod cache;
pub mod voigt;
pub mod widths;

pub use cache::{LineShapeCache, LineShapeConfig, WidthGrid};
