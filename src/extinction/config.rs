//! # 构建配置
//!
//! 所有字段均可缺省，由 `OpacityBuilder::validate` 统一检查并报告缺失项。
//!
//! ## 依赖关系
//! - 被 `extinction/builder.rs` 和 `commands/` 使用

use crate::broadening::LineShapeConfig;
use crate::database::DatabaseSpec;
use crate::error::{ExlineError, Result};

use std::path::PathBuf;

/// 输出波数网格（闭区间，等步长）
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralGrid {
    /// 下限 (cm⁻¹)
    pub wn_min: f64,
    /// 上限 (cm⁻¹)
    pub wn_max: f64,
    /// 步长 (cm⁻¹)
    pub wn_step: f64,
    /// 线型采样的过采样因子
    pub oversampling: usize,
}

impl SpectralGrid {
    pub fn new(wn_min: f64, wn_max: f64, wn_step: f64, oversampling: usize) -> Self {
        Self {
            wn_min,
            wn_max,
            wn_step,
            oversampling,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.wn_min > 0.0 && self.wn_max > self.wn_min) {
            return Err(ExlineError::InvalidRange(format!(
                "Wavenumber range {}--{} cm-1 must be positive and increasing",
                self.wn_min, self.wn_max
            )));
        }
        if !(self.wn_step > 0.0) {
            return Err(ExlineError::InvalidArgument(format!(
                "Wavenumber step must be positive (got {} cm-1)",
                self.wn_step
            )));
        }
        if self.oversampling == 0 {
            return Err(ExlineError::InvalidArgument(
                "Oversampling factor must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// 输出网格点数
    pub fn nwave(&self) -> usize {
        ((self.wn_max - self.wn_min) / self.wn_step + 1e-9).floor() as usize + 1
    }

    /// 输出网格波数
    pub fn wavenumbers(&self) -> Vec<f64> {
        (0..self.nwave())
            .map(|i| self.wn_min + i as f64 * self.wn_step)
            .collect()
    }

    /// 线型采样步长
    pub fn fine_step(&self) -> f64 {
        self.wn_step / self.oversampling as f64
    }
}

impl Default for SpectralGrid {
    fn default() -> Self {
        Self::new(1.0e4 / 5.0, 1.0e4 / 0.5, 1.0, 10)
    }
}

/// 不透明度表构建配置
#[derive(Debug, Clone)]
pub struct OpacityConfig {
    /// 输出文件
    pub output: Option<PathBuf>,
    /// 温度下限 (K)
    pub tmin: Option<f64>,
    /// 温度上限 (K)
    pub tmax: Option<f64>,
    /// 温度步长 (K)
    pub tstep: Option<f64>,
    /// 谱线数据库
    pub databases: Vec<DatabaseSpec>,
    /// 同位素信息表
    pub isotopes: Option<PathBuf>,
    pub spectrum: SpectralGrid,
    pub line_shape: LineShapeConfig,
    /// 相对最强谱线的强度阈值，0 表示不过滤
    pub ethresh: f64,
    /// 并行 worker 数，0 表示全部 CPU
    pub ncpu: usize,
}

impl Default for OpacityConfig {
    fn default() -> Self {
        Self {
            output: None,
            tmin: None,
            tmax: None,
            tstep: None,
            databases: Vec::new(),
            isotopes: None,
            spectrum: SpectralGrid::default(),
            line_shape: LineShapeConfig::default(),
            ethresh: 1e-15,
            ncpu: 1,
        }
    }
}
