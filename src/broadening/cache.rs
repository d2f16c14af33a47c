//! # 线型缓存
//!
//! 将 (Doppler, Lorentz) 宽度量化到两条对数等距的网格上，
//! 每个网格点对只计算一次 Voigt 线型并共享。
//!
//! ## 采样
//! - 采样步长 = 输出网格步长 / 过采样因子
//! - 半宽 `n = ceil(extent · V_hwhm / step)`，可被绝对截断距离 (cm⁻¹) 限制
//! - `V_hwhm < step/2` 时线型退化为单点，值为 `1/step`
//!
//! 构建前由调用方预先填充；并行阶段只读访问，未命中时计算临时线型。
//!
//! ## 依赖关系
//! - 被 `extinction/` 使用
//! - 使用 `broadening/voigt.rs` 和 `broadening/widths.rs`

use super::voigt::voigt;
use super::widths::voigt_hwhm;
use crate::error::{ExlineError, Result};

use std::collections::HashMap;
use std::sync::Arc;

/// 线型相关参数
#[derive(Debug, Clone, PartialEq)]
pub struct LineShapeConfig {
    /// 线型延伸到多少个 Voigt 半宽
    pub extent: f64,
    /// 绝对截断距离 (cm⁻¹)
    pub cutoff: Option<f64>,
    /// Doppler 网格点数
    pub ndop: usize,
    /// Lorentz 网格点数
    pub nlor: usize,
    /// Lorentz/Doppler 比值低于此值时使用最窄的 Lorentz 网格点
    pub dlratio: f64,
}

impl Default for LineShapeConfig {
    fn default() -> Self {
        Self {
            extent: 20.0,
            cutoff: Some(25.0),
            ndop: 40,
            nlor: 40,
            dlratio: 0.1,
        }
    }
}

/// 对数等距的宽度网格
#[derive(Debug, Clone, PartialEq)]
pub struct WidthGrid {
    pub doppler: Vec<f64>,
    pub lorentz: Vec<f64>,
}

fn log_spaced(min: f64, max: f64, n: usize, what: &str) -> Result<Vec<f64>> {
    if !(min > 0.0 && max.is_finite() && max >= min) || n == 0 {
        return Err(ExlineError::InvalidArgument(format!(
            "Invalid {} width bounds {:.3e}--{:.3e} cm-1 with {} bins",
            what, min, max, n
        )));
    }
    if n == 1 {
        return Ok(vec![min]);
    }
    let (lo, hi) = (min.ln(), max.ln());
    Ok((0..n)
        .map(|i| (lo + (hi - lo) * i as f64 / (n - 1) as f64).exp())
        .collect())
}

/// 对数空间中最近的网格点（越界时取端点）
fn nearest(grid: &[f64], value: f64) -> usize {
    let upper = grid.partition_point(|&g| g < value);
    if upper == 0 {
        return 0;
    }
    if upper >= grid.len() {
        return grid.len() - 1;
    }
    let lower = upper - 1;
    if (value / grid[lower]).ln() <= (grid[upper] / value).ln() {
        lower
    } else {
        upper
    }
}

impl WidthGrid {
    pub fn new(
        doppler: (f64, f64),
        lorentz: (f64, f64),
        config: &LineShapeConfig,
    ) -> Result<Self> {
        Ok(Self {
            doppler: log_spaced(doppler.0, doppler.1, config.ndop, "Doppler")?,
            lorentz: log_spaced(lorentz.0, lorentz.1, config.nlor, "Lorentz")?,
        })
    }

    pub fn doppler_bin(&self, doppler: f64) -> usize {
        nearest(&self.doppler, doppler)
    }

    /// Lorentz 网格点；相对 Doppler 过窄时取 0
    pub fn lorentz_bin(&self, lorentz: f64, doppler: f64, dlratio: f64) -> usize {
        if lorentz < dlratio * doppler {
            0
        } else {
            nearest(&self.lorentz, lorentz)
        }
    }
}

/// 采样后的归一化 Voigt 线型
#[derive(Debug, Clone, PartialEq)]
pub struct LineShapeProfile {
    pub doppler: f64,
    pub lorentz: f64,
    pub step: f64,
    half_size: usize,
    samples: Vec<f64>,
}

impl LineShapeProfile {
    pub fn compute(doppler: f64, lorentz: f64, step: f64, extent: f64, cutoff: Option<f64>) -> Self {
        let hwhm = voigt_hwhm(doppler, lorentz);
        if hwhm < 0.5 * step {
            return Self {
                doppler,
                lorentz,
                step,
                half_size: 0,
                samples: vec![1.0 / step],
            };
        }

        let mut half_width = extent * hwhm;
        if let Some(cutoff) = cutoff {
            half_width = half_width.min(cutoff);
        }
        let half_size = (half_width / step).ceil() as usize;
        let samples = (0..=2 * half_size)
            .map(|i| voigt((i as f64 - half_size as f64) * step, doppler, lorentz))
            .collect();

        Self {
            doppler,
            lorentz,
            step,
            half_size,
            samples,
        }
    }

    /// 单侧采样点数
    pub fn half_size(&self) -> usize {
        self.half_size
    }

    /// 截断距离 (cm⁻¹)
    pub fn cutoff(&self) -> f64 {
        self.half_size as f64 * self.step
    }

    /// 相对中心偏移 `offset` 个采样步长处的值，超出截断为 0
    pub fn at(&self, offset: isize) -> f64 {
        if offset.unsigned_abs() > self.half_size {
            0.0
        } else {
            self.samples[(offset + self.half_size as isize) as usize]
        }
    }
}

/// 按宽度网格点对缓存的线型
#[derive(Debug, Clone)]
pub struct LineShapeCache {
    grid: WidthGrid,
    config: LineShapeConfig,
    step: f64,
    profiles: HashMap<(usize, usize), Arc<LineShapeProfile>>,
}

impl LineShapeCache {
    pub fn new(grid: WidthGrid, config: LineShapeConfig, step: f64) -> Self {
        Self {
            grid,
            config,
            step,
            profiles: HashMap::new(),
        }
    }

    pub fn grid(&self) -> &WidthGrid {
        &self.grid
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// 宽度对应的网格点对
    pub fn bins(&self, doppler: f64, lorentz: f64) -> (usize, usize) {
        let idop = self.grid.doppler_bin(doppler);
        let ilor = self
            .grid
            .lorentz_bin(lorentz, self.grid.doppler[idop], self.config.dlratio);
        (idop, ilor)
    }

    fn compute(&self, key: (usize, usize)) -> LineShapeProfile {
        LineShapeProfile::compute(
            self.grid.doppler[key.0],
            self.grid.lorentz[key.1],
            self.step,
            self.config.extent,
            self.config.cutoff,
        )
    }

    /// 确保网格点对已计算
    fn populate(&mut self, key: (usize, usize)) {
        if !self.profiles.contains_key(&key) {
            let profile = Arc::new(self.compute(key));
            self.profiles.insert(key, profile);
        }
    }

    /// 查找或计算并插入
    pub fn lookup(&mut self, doppler: f64, lorentz: f64) -> Arc<LineShapeProfile> {
        let key = self.bins(doppler, lorentz);
        self.populate(key);
        self.profiles[&key].clone()
    }

    /// 只读查找
    #[cfg(test)]
    pub fn get(&self, doppler: f64, lorentz: f64) -> Option<Arc<LineShapeProfile>> {
        self.profiles.get(&self.bins(doppler, lorentz)).cloned()
    }

    /// 只读查找，未命中时计算临时线型（不插入）
    pub fn profile(&self, doppler: f64, lorentz: f64) -> Arc<LineShapeProfile> {
        let key = self.bins(doppler, lorentz);
        match self.profiles.get(&key) {
            Some(profile) => profile.clone(),
            None => Arc::new(self.compute(key)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_cache() -> LineShapeCache {
        let config = LineShapeConfig {
            cutoff: None,
            ..LineShapeConfig::default()
        };
        let grid = WidthGrid::new((0.01, 0.1), (1e-4, 1.0), &config).unwrap();
        LineShapeCache::new(grid, config, 0.001)
    }

    #[test]
    fn test_grid_is_log_spaced() {
        let grid = WidthGrid::new((0.01, 1.0), (1e-3, 1e-1), &LineShapeConfig::default()).unwrap();
        assert_eq!(grid.doppler.len(), 40);
        assert_relative_eq!(grid.doppler[0], 0.01, max_relative = 1e-12);
        assert_relative_eq!(grid.doppler[39], 1.0, max_relative = 1e-12);
        let ratio = grid.doppler[1] / grid.doppler[0];
        assert_relative_eq!(grid.doppler[21] / grid.doppler[20], ratio, max_relative = 1e-9);
    }

    #[test]
    fn test_nearest_clamps() {
        let grid = [1.0, 10.0, 100.0];
        assert_eq!(nearest(&grid, 0.1), 0);
        assert_eq!(nearest(&grid, 3.0), 0);
        assert_eq!(nearest(&grid, 3.5), 1);
        assert_eq!(nearest(&grid, 1e4), 2);
    }

    #[test]
    fn test_dlratio_snaps_to_first_lorentz_bin() {
        let cache = sample_cache();
        let (_, ilor) = cache.bins(0.05, 0.001);
        assert_eq!(ilor, 0);
        let (_, ilor) = cache.bins(0.05, 0.5);
        assert!(ilor > 0);
    }

    #[test]
    fn test_lookup_shares_profiles() {
        let mut cache = sample_cache();
        let a = cache.lookup(0.0500, 0.2);
        let b = cache.lookup(0.0501, 0.2001);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache.get(0.05, 0.2).is_some());
        assert!(cache.get(0.01, 1e-4).is_none());
    }

    #[test]
    fn test_transient_profile_not_inserted() {
        let cache = sample_cache();
        let profile = cache.profile(0.02, 0.01);
        assert!(profile.half_size() > 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_profile_extent_and_area() {
        let profile = LineShapeProfile::compute(0.05, 0.01, 0.001, 100.0, None);
        let area: f64 = (-(profile.half_size() as isize)..=profile.half_size() as isize)
            .map(|i| profile.at(i) * profile.step)
            .sum();
        assert_relative_eq!(area, 1.0, max_relative = 5e-3);
        assert_eq!(profile.at(profile.half_size() as isize + 1), 0.0);
        assert_relative_eq!(profile.at(3), profile.at(-3));
    }

    #[test]
    fn test_cutoff_caps_extent() {
        let profile = LineShapeProfile::compute(0.05, 0.5, 0.01, 100.0, Some(2.0));
        assert_eq!(profile.half_size(), 200);
        assert_relative_eq!(profile.cutoff(), 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_narrow_profile_is_single_sample() {
        let profile = LineShapeProfile::compute(1e-5, 1e-6, 0.01, 20.0, None);
        assert_eq!(profile.half_size(), 0);
        assert_relative_eq!(profile.at(0), 100.0);
    }

    #[test]
    fn test_invalid_bounds() {
        assert!(WidthGrid::new((0.0, 1.0), (1e-3, 1e-2), &LineShapeConfig::default()).is_err());
        assert!(WidthGrid::new((0.1, 0.01), (1e-3, 1e-2), &LineShapeConfig::default()).is_err());
    }
}
