//! # 多项式配分函数
//!
//! ## 公式
//! ln Q(T) = Σ_{k=0..5} c_k (ln T)^k
//!
//! 参考 Irwin (1981), ApJS 45, 621，式 (2)。
//! 在 1000–7000 K、步长 50 K 的固定温度网格上求值。
//!
//! ## 依赖关系
//! - 被 `partition/mod.rs` 使用

use ndarray::Array2;

/// 多项式阶数 + 1
pub const NCOEFF: usize = 6;

/// 多项式形式的采样温度下限 (K)
pub const TMIN: f64 = 1000.0;
/// 多项式形式的采样温度上限 (K)
pub const TMAX: f64 = 7000.0;
/// 多项式形式的采样步长 (K)
pub const TSTEP: f64 = 50.0;

/// 单个温度处的配分函数
pub fn evaluate(coeffs: &[f64; NCOEFF], temperature: f64) -> f64 {
    let log_t = temperature.ln();
    // Horner 形式
    let log_q = coeffs.iter().rev().fold(0.0, |acc, c| acc * log_t + c);
    log_q.exp()
}

/// 对每个同位素在温度网格上求值，返回 [isotope, temperature]
pub fn tabulate(coeffs: &[[f64; NCOEFF]], temperature: &[f64]) -> Array2<f64> {
    Array2::from_shape_fn((coeffs.len(), temperature.len()), |(i, j)| {
        evaluate(&coeffs[i], temperature[j])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Plez VO 线表的系数
    const VO: [f64; NCOEFF] = [
        6.62090157e+02,
        -4.03350494e+02,
        9.82836218e+01,
        -1.18526504e+01,
        7.08429905e-01,
        -1.67235124e-02,
    ];

    #[test]
    fn test_matches_direct_power_sum() {
        let t: f64 = 1000.0;
        let lt = t.ln();
        let direct: f64 = VO
            .iter()
            .enumerate()
            .map(|(k, c)| c * lt.powi(k as i32))
            .sum::<f64>()
            .exp();
        let value = evaluate(&VO, t);
        assert!(((value - direct) / direct).abs() < 1e-9);
    }

    #[test]
    fn test_tabulate_shape() {
        let temps = [1000.0, 2000.0, 3000.0];
        let table = tabulate(&[VO, VO], &temps);
        assert_eq!(table.dim(), (2, 3));
        assert_eq!(table[[0, 1]], table[[1, 1]]);
        assert!(table[[0, 2]] > table[[0, 0]]);
    }
}
