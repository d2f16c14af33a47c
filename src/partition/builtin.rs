//! # 内置配分函数（刚性转子–谐振子近似）
//!
//! 以 HITRAN 分子编号为键的闭式配分函数，在 70–3000 K、步长 10 K 的固定网格上求值。
//!
//! ## 公式
//! Q = g · Q_rot · Q_vib
//! - 线性转子: Q_rot = (T/θ + 1/3 + θ/(15T)) / σ，θ = c₂B
//! - 非线性转子: Q_rot = √π/σ · √(T³/(θ_A θ_B θ_C))
//! - Q_vib = Π (1 − exp(−c₂ω/T))^(−d)
//!
//! g 为核自旋/电子简并因子，取值使 296 K 时与 HITRAN 约定的量级一致。
//! 同位素体按质量比缩放：转动常数 ∝ m_ref/m，振动频率 ∝ √(m_ref/m)，
//! m_ref 为同位素列表中第一个（丰度最高）同位素的质量。
//!
//! ## 数据来源
//! NIST Computational Chemistry Comparison and Benchmark Database (CCCBDB)
//!
//! ## 依赖关系
//! - 被 `partition/mod.rs` 使用
//! - 纯静态数据，无外部依赖

use crate::constants::C2;
use crate::error::{ExlineError, Result};

use ndarray::Array2;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::LazyLock;

/// 内置形式的采样温度下限 (K)
pub const TMIN: f64 = 70.0;
/// 内置形式的采样温度上限 (K)
pub const TMAX: f64 = 3000.0;
/// 内置形式的采样步长 (K)
pub const TSTEP: f64 = 10.0;

/// 转子类型与转动常数 (cm⁻¹)
#[derive(Debug, Clone, Copy)]
pub enum Rotor {
    Linear { b: f64 },
    Nonlinear { a: f64, b: f64, c: f64 },
}

/// 刚性转子–谐振子参数
#[derive(Debug, Clone, Copy)]
pub struct RrhoParams {
    pub molecule: &'static str,
    pub rotor: Rotor,
    /// 对称数 σ
    pub symmetry: f64,
    /// 简并因子 g
    pub degeneracy: f64,
    /// 振动模式 (频率 cm⁻¹, 简并度)
    pub modes: &'static [(f64, u32)],
}

impl RrhoParams {
    /// 质量缩放因子 s = m_ref/m 下的配分函数
    pub fn evaluate(&self, temperature: f64, mass_scale: f64) -> f64 {
        let q_rot = match self.rotor {
            Rotor::Linear { b } => {
                let theta = C2 * b * mass_scale;
                (temperature / theta + 1.0 / 3.0 + theta / (15.0 * temperature)) / self.symmetry
            }
            Rotor::Nonlinear { a, b, c } => {
                let s3 = mass_scale * mass_scale * mass_scale;
                let theta3 = C2 * a * C2 * b * C2 * c * s3;
                PI.sqrt() / self.symmetry * (temperature.powi(3) / theta3).sqrt()
            }
        };
        let freq_scale = mass_scale.sqrt();
        let q_vib: f64 = self
            .modes
            .iter()
            .map(|&(omega, d)| (1.0 - (-C2 * omega * freq_scale / temperature).exp()).powi(-(d as i32)))
            .product();
        self.degeneracy * q_rot * q_vib
    }
}

/// 内置分子参数表（HITRAN 分子编号）
pub static RRHO_TABLE: LazyLock<HashMap<u32, RrhoParams>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // 水 (H2O)
    m.insert(
        1,
        RrhoParams {
            molecule: "H2O",
            rotor: Rotor::Nonlinear {
                a: 27.88,
                b: 14.51,
                c: 9.28,
            },
            symmetry: 2.0,
            degeneracy: 4.0,
            modes: &[(3657.0, 1), (1595.0, 1), (3756.0, 1)],
        },
    );

    // 二氧化碳 (CO2)
    m.insert(
        2,
        RrhoParams {
            molecule: "CO2",
            rotor: Rotor::Linear { b: 0.3902 },
            symmetry: 2.0,
            degeneracy: 1.0,
            modes: &[(1333.0, 1), (667.0, 2), (2349.0, 1)],
        },
    );

    // 臭氧 (O3)
    m.insert(
        3,
        RrhoParams {
            molecule: "O3",
            rotor: Rotor::Nonlinear {
                a: 3.553,
                b: 0.4453,
                c: 0.3948,
            },
            symmetry: 2.0,
            degeneracy: 1.0,
            modes: &[(1103.0, 1), (701.0, 1), (1042.0, 1)],
        },
    );

    // 一氧化二氮 (N2O)
    m.insert(
        4,
        RrhoParams {
            molecule: "N2O",
            rotor: Rotor::Linear { b: 0.4190 },
            symmetry: 1.0,
            degeneracy: 9.0,
            modes: &[(1285.0, 1), (589.0, 2), (2224.0, 1)],
        },
    );

    // 一氧化碳 (CO)
    m.insert(
        5,
        RrhoParams {
            molecule: "CO",
            rotor: Rotor::Linear { b: 1.9313 },
            symmetry: 1.0,
            degeneracy: 1.0,
            modes: &[(2143.0, 1)],
        },
    );

    // 甲烷 (CH4)
    m.insert(
        6,
        RrhoParams {
            molecule: "CH4",
            rotor: Rotor::Nonlinear {
                a: 5.241,
                b: 5.241,
                c: 5.241,
            },
            symmetry: 12.0,
            degeneracy: 16.0,
            modes: &[(2917.0, 1), (1534.0, 2), (3019.0, 3), (1306.0, 3)],
        },
    );

    // 氧气 (O2)，电子基态三重态
    m.insert(
        7,
        RrhoParams {
            molecule: "O2",
            rotor: Rotor::Linear { b: 1.4377 },
            symmetry: 2.0,
            degeneracy: 3.0,
            modes: &[(1556.0, 1)],
        },
    );

    // 一氧化氮 (NO)
    m.insert(
        8,
        RrhoParams {
            molecule: "NO",
            rotor: Rotor::Linear { b: 1.6720 },
            symmetry: 1.0,
            degeneracy: 9.0,
            modes: &[(1876.0, 1)],
        },
    );

    // 二氧化硫 (SO2)
    m.insert(
        9,
        RrhoParams {
            molecule: "SO2",
            rotor: Rotor::Nonlinear {
                a: 2.0274,
                b: 0.3442,
                c: 0.2935,
            },
            symmetry: 2.0,
            degeneracy: 1.0,
            modes: &[(1151.0, 1), (518.0, 1), (1362.0, 1)],
        },
    );

    // 氨 (NH3)
    m.insert(
        11,
        RrhoParams {
            molecule: "NH3",
            rotor: Rotor::Nonlinear {
                a: 9.444,
                b: 9.444,
                c: 6.196,
            },
            symmetry: 3.0,
            degeneracy: 24.0,
            modes: &[(3337.0, 1), (950.0, 1), (3444.0, 2), (1627.0, 2)],
        },
    );

    // 羟基 (OH)
    m.insert(
        13,
        RrhoParams {
            molecule: "OH",
            rotor: Rotor::Linear { b: 18.91 },
            symmetry: 1.0,
            degeneracy: 7.0,
            modes: &[(3738.0, 1)],
        },
    );

    // 氰化氢 (HCN)
    m.insert(
        23,
        RrhoParams {
            molecule: "HCN",
            rotor: Rotor::Linear { b: 1.4782 },
            symmetry: 1.0,
            degeneracy: 6.0,
            modes: &[(3311.0, 1), (712.0, 2), (2097.0, 1)],
        },
    );

    // 乙炔 (C2H2)
    m.insert(
        26,
        RrhoParams {
            molecule: "C2H2",
            rotor: Rotor::Linear { b: 1.1766 },
            symmetry: 2.0,
            degeneracy: 4.0,
            modes: &[
                (3374.0, 1),
                (1974.0, 1),
                (3289.0, 1),
                (612.0, 2),
                (730.0, 2),
            ],
        },
    );

    // 硫化氢 (H2S)
    m.insert(
        31,
        RrhoParams {
            molecule: "H2S",
            rotor: Rotor::Nonlinear {
                a: 10.36,
                b: 9.016,
                c: 4.73,
            },
            symmetry: 2.0,
            degeneracy: 4.0,
            modes: &[(2615.0, 1), (1183.0, 1), (2626.0, 1)],
        },
    );

    m
});

/// 在温度网格上计算各同位素的配分函数，返回 [isotope, temperature]
pub fn tabulate(molecule_id: u32, masses: &[f64], temperature: &[f64]) -> Result<Array2<f64>> {
    let params = RRHO_TABLE.get(&molecule_id).ok_or_else(|| {
        ExlineError::Configuration(format!(
            "No built-in partition function for molecule ID {}",
            molecule_id
        ))
    })?;
    let reference = masses.first().copied().ok_or_else(|| {
        ExlineError::Configuration(format!(
            "No isotopes available to evaluate the built-in partition function of {}",
            params.molecule
        ))
    })?;

    Ok(Array2::from_shape_fn(
        (masses.len(), temperature.len()),
        |(i, j)| params.evaluate(temperature[j], reference / masses[i]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 296 K 下 HITRAN 约定的参考值
    fn reference_q(id: u32) -> f64 {
        match id {
            1 => 174.58,
            2 => 286.09,
            5 => 107.42,
            6 => 590.48,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_magnitude_at_296k() {
        for id in [1, 2, 5, 6] {
            let q = RRHO_TABLE[&id].evaluate(296.0, 1.0);
            let expected = reference_q(id);
            assert!(
                ((q - expected) / expected).abs() < 0.05,
                "molecule {}: {} vs {}",
                id,
                q,
                expected
            );
        }
    }

    #[test]
    fn test_heavier_isotope_has_larger_q() {
        let table = tabulate(5, &[27.9949, 28.9983], &[300.0, 1000.0]).unwrap();
        assert!(table[[1, 0]] > table[[0, 0]]);
        assert!(table[[0, 1]] > table[[0, 0]]);
    }

    #[test]
    fn test_unknown_molecule() {
        assert!(tabulate(999, &[1.0], &[300.0]).is_err());
    }
}
