//! # 展宽半高半宽 (HWHM)
//!
//! ## 公式
//! - Doppler: `D = ν/c · sqrt(2kT ln2 / m)`
//! - Lorentz: `L = Σ_j n_j (r_i + r_j)² sqrt(2kT/π · (1/m_i + 1/m_j)) / c`
//! - Voigt (Olivero & Longbothum 1977): `V ≈ 0.5346 L + sqrt(0.2166 L² + D²)`
//!
//! 质量以 amu 计，半径以 cm 计，数密度以 cm⁻³ 计。
//!
//! ## 依赖关系
//! - 被 `broadening/cache.rs` 和 `extinction/` 使用

use crate::constants::{AMU, ANGSTROM, BOLTZMANN, LIGHT_SPEED};

use std::f64::consts::{LN_2, PI};

/// 估算宽度上下界时使用的参考碰撞对象 (H₂)
pub const REFERENCE_MASS: f64 = 2.01588;
/// H₂ 碰撞半径 (cm)
pub const REFERENCE_RADIUS: f64 = 1.445 * ANGSTROM;

/// Doppler HWHM (cm⁻¹)
pub fn doppler_hwhm(wavenumber: f64, temperature: f64, mass: f64) -> f64 {
    wavenumber / LIGHT_SPEED * (2.0 * BOLTZMANN * temperature * LN_2 / (mass * AMU)).sqrt()
}

/// 一对碰撞粒子对 Lorentz HWHM 的贡献系数（乘以数密度即为贡献）
fn collision_term(temperature: f64, mass: f64, radius: f64, partner_mass: f64, partner_radius: f64) -> f64 {
    (radius + partner_radius).powi(2)
        * (2.0 * BOLTZMANN * temperature / PI * (1.0 / mass + 1.0 / partner_mass) / AMU).sqrt()
        / LIGHT_SPEED
}

/// Lorentz HWHM (cm⁻¹)
///
/// `partners` 为各碰撞对象的 (数密度, 质量, 半径)。
pub fn lorentz_hwhm(
    temperature: f64,
    mass: f64,
    radius: f64,
    partners: impl IntoIterator<Item = (f64, f64, f64)>,
) -> f64 {
    partners
        .into_iter()
        .map(|(density, m, r)| density * collision_term(temperature, mass, radius, m, r))
        .sum()
}

/// Voigt HWHM 近似
pub fn voigt_hwhm(doppler: f64, lorentz: f64) -> f64 {
    0.5346 * lorentz + (0.2166 * lorentz * lorentz + doppler * doppler).sqrt()
}

/// 与参考碰撞对象 (H₂) 在压强 `pressure` (barye) 下的 Lorentz HWHM
fn reference_lorentz(temperature: f64, mass: f64, radius: f64, pressure: f64) -> f64 {
    let density = pressure / (BOLTZMANN * temperature);
    lorentz_hwhm(
        temperature,
        mass,
        radius,
        [(density, REFERENCE_MASS, REFERENCE_RADIUS)],
    )
}

/// 可能出现的最小 (Doppler, Lorentz) 宽度
pub fn min_widths(
    min_temp: f64,
    max_temp: f64,
    min_wn: f64,
    max_mass: f64,
    min_radius: f64,
    min_pressure: f64,
) -> (f64, f64) {
    let dmin = doppler_hwhm(min_wn, min_temp, max_mass);
    let lmin = reference_lorentz(max_temp, max_mass, min_radius, min_pressure);
    (dmin, lmin)
}

/// 可能出现的最大 (Doppler, Lorentz) 宽度
pub fn max_widths(
    min_temp: f64,
    max_temp: f64,
    max_wn: f64,
    min_mass: f64,
    max_radius: f64,
    max_pressure: f64,
) -> (f64, f64) {
    let dmax = doppler_hwhm(max_wn, max_temp, min_mass);
    let lmax = reference_lorentz(min_temp, min_mass, max_radius, max_pressure);
    (dmax, lmax)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::BAR;
    use approx::assert_relative_eq;

    #[test]
    fn test_min_widths() {
        let (dmin, lmin) = min_widths(
            500.0,
            2500.0,
            1.0e4 / 0.6,
            27.02534,
            2.5 * ANGSTROM,
            1e-5 * BAR,
        );
        assert_relative_eq!(dmin, 0.025672743788107903, max_relative = 1e-4);
        assert_relative_eq!(lmin, 3.9945391902150206e-07, max_relative = 1e-4);
    }

    #[test]
    fn test_max_widths() {
        let (dmax, lmax) = max_widths(
            500.0,
            2500.0,
            1.0e4 / 12.0,
            1.00794,
            2.89 / 2.0 * ANGSTROM,
            100.0 * BAR,
        );
        assert_relative_eq!(dmax, 0.01486262554305687, max_relative = 1e-4);
        assert_relative_eq!(lmax, 8.009255370607491, max_relative = 1e-4);
    }

    #[test]
    fn test_voigt_hwhm_limits() {
        assert_relative_eq!(voigt_hwhm(1.0, 0.0), 1.0);
        // 纯 Lorentz 极限：0.5346 + sqrt(0.2166) ≈ 1.0000
        assert_relative_eq!(voigt_hwhm(0.0, 1.0), 1.0, max_relative = 1e-3);
    }

    #[test]
    fn test_lorentz_sums_partners() {
        let one = lorentz_hwhm(1000.0, 18.0, 1.6e-8, [(1e18, 2.0, 1.4e-8)]);
        let two = lorentz_hwhm(1000.0, 18.0, 1.6e-8, [(1e18, 2.0, 1.4e-8), (1e18, 2.0, 1.4e-8)]);
        assert_relative_eq!(two, 2.0 * one);
        assert_eq!(lorentz_hwhm(1000.0, 18.0, 1.6e-8, []), 0.0);
    }
}
