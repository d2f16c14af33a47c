//! # Voigt 线型
//!
//! 归一化 Voigt 线型 `V(x) = sqrt(ln2/π)/D · Re w(z)`，
//! `z = sqrt(ln2) · (x + iL) / D`，`w` 为 Faddeeva 函数。
//!
//! ## 算法
//! Humlíček (1982), JQSRT 27, 437 的 W4 有理近似，四个区域分段求值，
//! 相对精度约 1e-4。
//!
//! ## 依赖关系
//! - 被 `broadening/cache.rs` 使用
//! - 使用 `num-complex` 做复数运算

use num_complex::Complex64;
use std::f64::consts::{LN_2, PI};

/// Faddeeva 函数 w(x + iy)，y >= 0
pub fn faddeeva(x: f64, y: f64) -> Complex64 {
    let t = Complex64::new(y, -x);
    let s = x.abs() + y;

    if s >= 15.0 {
        // 区域 I
        t * 0.5641896 / (0.5 + t * t)
    } else if s >= 5.5 {
        // 区域 II
        let u = t * t;
        t * (1.410474 + u * 0.5641896) / (0.75 + u * (3.0 + u))
    } else if y >= 0.195 * x.abs() - 0.176 {
        // 区域 III
        let num = 16.4955 + t * (20.20933 + t * (11.96482 + t * (3.778987 + t * 0.5642236)));
        let den = 16.4955
            + t * (38.82363 + t * (39.27121 + t * (21.69274 + t * (6.699398 + t))));
        num / den
    } else {
        // 区域 IV
        let u = t * t;
        let num = t
            * (36183.31
                - u * (3321.9905
                    - u * (1540.787 - u * (219.0313 - u * (35.76683 - u * (1.320522 - u * 0.56419))))));
        let den = 32066.6
            - u * (24322.84
                - u * (9022.228
                    - u * (2186.181 - u * (364.2191 - u * (61.57037 - u * (1.841439 - u))))));
        u.exp() - num / den
    }
}

/// 归一化 Voigt 线型在偏移 `x` (cm⁻¹) 处的值
pub fn voigt(x: f64, doppler: f64, lorentz: f64) -> f64 {
    let scale = LN_2.sqrt() / doppler;
    (LN_2 / PI).sqrt() / doppler * faddeeva(x * scale, lorentz * scale).re
}
