//! # 物理常数（CGS 单位制）
//!
//! ## 依赖关系
//! - 被 `broadening/`, `extinction/`, `partition/`, `models/` 使用
//! - 无外部模块依赖

/// 光速 (cm s⁻¹)
pub const LIGHT_SPEED: f64 = 2.99792458e10;

/// Boltzmann 常数 (erg K⁻¹)
pub const BOLTZMANN: f64 = 1.380649e-16;

/// Planck 常数 (erg s)
pub const PLANCK: f64 = 6.62607015e-27;

/// 原子质量单位 (g)
pub const AMU: f64 = 1.66053906660e-24;

/// 第二辐射常数 c₂ = hc/k (cm K)
pub const C2: f64 = PLANCK * LIGHT_SPEED / BOLTZMANN;

/// 经典电子半径 (cm)
pub const ELECTRON_RADIUS: f64 = 2.8179403262e-13;

/// 谱线强度常数 πe²/(mₑc²) = π rₑ (cm)
pub const SIGMA_LINE: f64 = std::f64::consts::PI * ELECTRON_RADIUS;

/// 1 bar (dyn cm⁻²)
pub const BAR: f64 = 1.0e6;

/// 1 Å (cm)
pub const ANGSTROM: f64 = 1.0e-8;

/// 1 eV 对应的波数 (cm⁻¹)
pub const EV_TO_WAVENUMBER: f64 = 8065.543_937;
