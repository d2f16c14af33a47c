//! # 单元消光计算核心
//!
//! 对一个 (温度, 压力) 单元累加所有谱线的贡献。
//!
//! ## 公式
//! 谱线强度
//! `k = σ_c · gf · ratio · exp(−c₂·E_low/T) · (1 − exp(−c₂·ν/T)) / Q(T)`，
//! 乘以归一化 Voigt 线型后累加到输出网格。
//!
//! ## 模式
//! - `PerSpecies`: 各物种分开存放，单位 cm² molecule⁻¹，输出 `[species, wave]`
//! - `Total`: 乘以物种数密度后求和，单位 cm⁻¹，输出 `[wave]`
//!
//! ## 依赖关系
//! - 被 `extinction/builder.rs` 调用
//! - 使用 `broadening/` 的宽度公式与线型缓存

use super::config::SpectralGrid;
use crate::broadening::widths::{doppler_hwhm, lorentz_hwhm};
use crate::broadening::LineShapeCache;
use crate::constants::{C2, SIGMA_LINE};
use crate::error::{ExlineError, Result};
use crate::models::{LineList, Species};

/// 参与计算的同位素
#[derive(Debug, Clone, PartialEq)]
pub struct IsotopeEntry {
    pub name: String,
    pub molecule: String,
    /// 质量 (amu)
    pub mass: f64,
    pub ratio: f64,
    /// 在输出物种列表中的索引
    pub species: usize,
    /// 在大气物种列表中的索引
    pub atm_index: usize,
}

/// 合并后的谱线集合（`lines.isotope` 为 `isotopes` 的索引）
#[derive(Debug, Clone, Default)]
pub struct LineSet {
    pub lines: LineList,
    pub isotopes: Vec<IsotopeEntry>,
    /// 输出物种名（按大气中的顺序）
    pub species: Vec<String>,
}

impl LineSet {
    /// 各同位素谱线的波数范围，无谱线时为 None
    pub fn wavenumber_span(&self) -> Vec<Option<(f64, f64)>> {
        let mut span: Vec<Option<(f64, f64)>> = vec![None; self.isotopes.len()];
        for (&wn, &iso) in self.lines.wavenumber.iter().zip(&self.lines.isotope) {
            span[iso] = Some(match span[iso] {
                Some((lo, hi)) => (lo.min(wn), hi.max(wn)),
                None => (wn, wn),
            });
        }
        span
    }
}

/// 累加方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulation {
    PerSpecies,
    Total,
}

/// 一个计算单元的物理条件
#[derive(Debug, Clone, Copy)]
pub struct CellConditions<'a> {
    /// 温度 (K)
    pub temperature: f64,
    /// 各大气物种数密度 (cm⁻³)
    pub density: &'a [f64],
    /// 各同位素在该温度下的配分函数
    pub pf: &'a [f64],
}

/// 各同位素的 Lorentz HWHM
pub fn lorentz_widths(set: &LineSet, atm_species: &[Species], cell: &CellConditions) -> Vec<f64> {
    set.isotopes
        .iter()
        .map(|iso| {
            let own = &atm_species[iso.atm_index];
            lorentz_hwhm(
                cell.temperature,
                own.mass,
                own.radius,
                atm_species
                    .iter()
                    .zip(cell.density)
                    .map(|(s, &n)| (n, s.mass, s.radius)),
            )
        })
        .collect()
}

/// 单条谱线的强度
fn line_strength(gf: f64, elow: f64, wavenumber: f64, ratio: f64, temperature: f64, pf: f64) -> f64 {
    SIGMA_LINE * gf * ratio * (-C2 * elow / temperature).exp()
        * (1.0 - (-C2 * wavenumber / temperature).exp())
        / pf
}

/// 计算一个单元的消光并累加到 `out`
///
/// `out` 在 `PerSpecies` 模式下长度为 `nspec × nwave`，`Total` 模式下为 `nwave`。
#[allow(clippy::too_many_arguments)]
pub fn accumulate(
    set: &LineSet,
    atm_species: &[Species],
    cache: &LineShapeCache,
    spectrum: &SpectralGrid,
    ethresh: f64,
    cell: &CellConditions,
    mode: Accumulation,
    out: &mut [f64],
) -> Result<()> {
    let nwave = spectrum.nwave();
    let expected = match mode {
        Accumulation::PerSpecies => set.species.len() * nwave,
        Accumulation::Total => nwave,
    };
    if out.len() != expected {
        return Err(ExlineError::Other(format!(
            "Output buffer holds {} values, expected {}",
            out.len(),
            expected
        )));
    }
    let temperature = cell.temperature;
    for (iso, &z) in set.isotopes.iter().zip(cell.pf) {
        if !(z > 0.0 && z.is_finite()) {
            return Err(ExlineError::InvalidArgument(format!(
                "Partition function of isotope '{}' at {:.1} K is {}",
                iso.name, temperature, z
            )));
        }
    }

    let lines = &set.lines;
    let strength = |i: usize| {
        let iso = lines.isotope[i];
        line_strength(
            lines.gf[i],
            lines.elow[i],
            lines.wavenumber[i],
            set.isotopes[iso].ratio,
            temperature,
            cell.pf[iso],
        )
    };

    // 每个物种的最强谱线
    let mut kmax = vec![0.0f64; set.species.len()];
    if ethresh > 0.0 {
        for i in 0..lines.len() {
            let spec = set.isotopes[lines.isotope[i]].species;
            kmax[spec] = kmax[spec].max(strength(i));
        }
    }

    let lorentz = lorentz_widths(set, atm_species, cell);
    let osamp = spectrum.oversampling as isize;
    let fine_step = cache.step();
    let last = nwave as isize - 1;

    for i in 0..lines.len() {
        let iso = &set.isotopes[lines.isotope[i]];
        let mut k = strength(i);
        if ethresh > 0.0 && k < ethresh * kmax[iso.species] {
            continue;
        }
        let offset = match mode {
            Accumulation::PerSpecies => iso.species * nwave,
            Accumulation::Total => {
                k *= cell.density[iso.atm_index];
                0
            }
        };
        let row = &mut out[offset..offset + nwave];

        let wn = lines.wavenumber[i];
        let doppler = doppler_hwhm(wn, temperature, iso.mass);
        let profile = cache.profile(doppler, lorentz[lines.isotope[i]]);
        let half = profile.half_size() as isize;

        if half == 0 {
            // 未分辨的窄线：整条线落在最近的输出点上
            let j = ((wn - spectrum.wn_min) / spectrum.wn_step).round() as isize;
            if (0..=last).contains(&j) {
                row[j as usize] += k * profile.at(0) / osamp as f64;
            }
            continue;
        }

        let center = ((wn - spectrum.wn_min) / fine_step).round() as isize;
        let jlo = (center - half + osamp - 1).div_euclid(osamp).max(0);
        let jhi = (center + half).div_euclid(osamp).min(last);
        for j in jlo..=jhi {
            row[j as usize] += k * profile.at(j * osamp - center);
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::broadening::{LineShapeConfig, WidthGrid};
    use crate::models::atmosphere::species_from_name;
    use approx::assert_relative_eq;

    pub(crate) fn single_line_set(wavenumber: f64) -> LineSet {
        LineSet {
            lines: LineList {
                wavenumber: vec![wavenumber],
                elow: vec![0.0],
                gf: vec![1.0],
                isotope: vec![0],
            },
            isotopes: vec![IsotopeEntry {
                name: "26".to_string(),
                molecule: "CO".to_string(),
                mass: 27.994915,
                ratio: 1.0,
                species: 0,
                atm_index: 1,
            }],
            species: vec!["CO".to_string()],
        }
    }

    fn cache_for(spectrum: &SpectralGrid) -> LineShapeCache {
        let config = LineShapeConfig {
            cutoff: None,
            extent: 200.0,
            ..LineShapeConfig::default()
        };
        let grid = WidthGrid::new((1e-3, 1.0), (1e-6, 1.0), &config).unwrap();
        LineShapeCache::new(grid, config, spectrum.fine_step())
    }

    fn species() -> Vec<Species> {
        vec![species_from_name("H2").unwrap(), species_from_name("CO").unwrap()]
    }

    #[test]
    fn test_integrated_strength_is_conserved() {
        let spectrum = SpectralGrid::new(1990.0, 2010.0, 0.001, 5);
        let cache = cache_for(&spectrum);
        let set = single_line_set(2000.0);
        let density = [1e17, 1e14];
        let cell = CellConditions {
            temperature: 1000.0,
            density: &density,
            pf: &[1.0],
        };
        let mut out = vec![0.0; spectrum.nwave()];
        accumulate(&set, &species(), &cache, &spectrum, 0.0, &cell, Accumulation::PerSpecies, &mut out)
            .unwrap();

        let area: f64 = out.iter().sum::<f64>() * spectrum.wn_step;
        let expected = line_strength(1.0, 0.0, 2000.0, 1.0, 1000.0, 1.0);
        assert_relative_eq!(area, expected, max_relative = 1e-2);
        // 峰值在线心
        let peak = out
            .iter()
            .enumerate()
            .fold((0, 0.0), |acc, (j, &v)| if v > acc.1 { (j, v) } else { acc });
        assert_eq!(peak.0, 10000);
    }

    #[test]
    fn test_total_mode_scales_by_density() {
        let spectrum = SpectralGrid::new(1990.0, 2010.0, 0.05, 2);
        let cache = cache_for(&spectrum);
        let set = single_line_set(2000.0);
        let density = [1e17, 3e14];
        let cell = CellConditions {
            temperature: 800.0,
            density: &density,
            pf: &[2.0],
        };
        let mut per_species = vec![0.0; spectrum.nwave()];
        let mut total = vec![0.0; spectrum.nwave()];
        let atm = species();
        accumulate(&set, &atm, &cache, &spectrum, 0.0, &cell, Accumulation::PerSpecies, &mut per_species)
            .unwrap();
        accumulate(&set, &atm, &cache, &spectrum, 0.0, &cell, Accumulation::Total, &mut total).unwrap();
        for (a, b) in per_species.iter().zip(&total) {
            assert_relative_eq!(a * 3e14, *b, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_ethresh_skips_weak_lines() {
        let spectrum = SpectralGrid::new(1990.0, 2010.0, 0.05, 2);
        let cache = cache_for(&spectrum);
        let mut set = single_line_set(2000.0);
        set.lines.wavenumber.push(2005.0);
        set.lines.elow.push(0.0);
        set.lines.gf.push(1e-6);
        set.lines.isotope.push(0);
        let density = [1e17, 1e14];
        let cell = CellConditions {
            temperature: 800.0,
            density: &density,
            pf: &[1.0],
        };
        let atm = species();
        let mut kept = vec![0.0; spectrum.nwave()];
        let mut skipped = vec![0.0; spectrum.nwave()];
        accumulate(&set, &atm, &cache, &spectrum, 0.0, &cell, Accumulation::PerSpecies, &mut kept).unwrap();
        accumulate(&set, &atm, &cache, &spectrum, 1e-3, &cell, Accumulation::PerSpecies, &mut skipped)
            .unwrap();
        let j = 300; // 2005 cm⁻¹
        assert!(kept[j] > skipped[j]);
        assert_relative_eq!(kept[200], skipped[200], max_relative = 1e-6);
    }

    #[test]
    fn test_nonpositive_pf_rejected() {
        let spectrum = SpectralGrid::new(1990.0, 2010.0, 0.05, 2);
        let cache = cache_for(&spectrum);
        let set = single_line_set(2000.0);
        let density = [1e17, 1e14];
        let cell = CellConditions {
            temperature: 800.0,
            density: &density,
            pf: &[0.0],
        };
        let mut out = vec![0.0; spectrum.nwave()];
        assert!(accumulate(&set, &species(), &cache, &spectrum, 0.0, &cell, Accumulation::PerSpecies, &mut out)
            .is_err());
    }

    #[test]
    fn test_wavenumber_span() {
        let mut set = single_line_set(2000.0);
        set.lines.wavenumber.push(1990.0);
        set.lines.elow.push(0.0);
        set.lines.gf.push(1.0);
        set.lines.isotope.push(0);
        set.isotopes.push(IsotopeEntry {
            name: "36".to_string(),
            ..set.isotopes[0].clone()
        });
        assert_eq!(set.wavenumber_span(), vec![Some((1990.0, 2000.0)), None]);
    }
}
