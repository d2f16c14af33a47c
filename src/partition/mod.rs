//! # 配分函数模块
//!
//! 每个同位素的 温度 → 配分函数 映射，三次样条插值，不外推。
//!
//! ## 来源
//! - `tabulated`: 外部表格文件（温度列 + 各同位素列）
//! - `builtin`: 内置刚性转子–谐振子闭式解（按分子编号，70–3000 K / 10 K）
//! - `polynomial`: ln Q 关于 ln T 的五次多项式（1000–7000 K / 50 K）
//!
//! ## 依赖关系
//! - 被 `database/` 构造，被 `extinction/` 查询
//! - 子模块: spline, tabulated, builtin, polynomial

pub mod builtin;
pub mod polynomial;
pub mod spline;
pub mod tabulated;

use crate::error::{ExlineError, Result};
use spline::CubicSpline;

use ndarray::Array2;
use std::fmt;
use std::path::PathBuf;

/// 配分函数来源
#[derive(Debug, Clone, PartialEq)]
pub enum PfSource {
    /// 外部表格文件
    Tabulated(PathBuf),
    /// 内置物理闭式解（按分子编号）
    Builtin,
    /// 数据库自带的多项式系数
    Polynomial,
}

impl PfSource {
    /// 解析命令行参数：`builtin`/`ctips`、`poly`，其余视为文件路径
    pub fn parse(arg: &str) -> Self {
        match arg.to_lowercase().as_str() {
            "builtin" | "ctips" => PfSource::Builtin,
            "poly" | "polynomial" => PfSource::Polynomial,
            _ => PfSource::Tabulated(PathBuf::from(arg)),
        }
    }
}

impl fmt::Display for PfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PfSource::Tabulated(path) => write!(f, "{}", path.display()),
            PfSource::Builtin => write!(f, "builtin"),
            PfSource::Polynomial => write!(f, "polynomial"),
        }
    }
}

/// 按固定步长生成闭区间温度网格
pub fn temperature_grid(tmin: f64, tmax: f64, step: f64) -> Vec<f64> {
    let n = ((tmax - tmin) / step + 1e-9).floor() as usize + 1;
    (0..n).map(|i| tmin + i as f64 * step).collect()
}

/// 配分函数表
#[derive(Debug, Clone)]
pub struct PartitionFunctionTable {
    molecule: String,
    isotopes: Vec<String>,
    temperature: Vec<f64>,
    /// [isotope, temperature]
    values: Array2<f64>,
    splines: Vec<CubicSpline>,
}

impl PartitionFunctionTable {
    /// 从共用温度网格和 [isotope, temperature] 数值构造
    pub fn new(
        molecule: impl Into<String>,
        isotopes: Vec<String>,
        temperature: Vec<f64>,
        values: Array2<f64>,
    ) -> Result<Self> {
        if values.dim() != (isotopes.len(), temperature.len()) {
            return Err(ExlineError::Configuration(format!(
                "Partition-function table shape {:?} does not match {} isotopes x {} temperatures",
                values.dim(),
                isotopes.len(),
                temperature.len()
            )));
        }

        let splines = values
            .rows()
            .into_iter()
            .zip(&isotopes)
            .map(|(row, name)| {
                CubicSpline::new(temperature.clone(), row.to_vec()).map_err(|reason| {
                    ExlineError::Configuration(format!(
                        "Invalid partition function for isotope '{}': {}",
                        name, reason
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            molecule: molecule.into(),
            isotopes,
            temperature,
            values,
            splines,
        })
    }

    pub fn isotopes(&self) -> &[String] {
        &self.isotopes
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.isotopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isotopes.is_empty()
    }

    /// 同位素的温度覆盖范围
    pub fn coverage(&self, isotope: usize) -> (f64, f64) {
        self.splines[isotope].domain()
    }

    /// 在 `temperature` 处插值同位素 `isotope` 的配分函数
    pub fn interpolate(&self, isotope: usize, temperature: f64) -> Result<f64> {
        let spline = self.splines.get(isotope).ok_or_else(|| {
            ExlineError::InvalidArgument(format!(
                "Isotope index {} out of range ({} isotopes)",
                isotope,
                self.isotopes.len()
            ))
        })?;
        spline.eval(temperature).ok_or_else(|| {
            let (min, max) = spline.domain();
            ExlineError::TemperatureOutOfRange {
                molecule: self.molecule.clone(),
                isotope: self.isotopes[isotope].clone(),
                requested: temperature,
                min,
                max,
            }
        })
    }

    /// 检查 [tmin, tmax] 是否被所有同位素覆盖
    pub fn validate_range(&self, tmin: f64, tmax: f64) -> Result<()> {
        for i in 0..self.isotopes.len() {
            let (min, max) = self.coverage(i);
            for requested in [tmin, tmax] {
                if !(requested >= min && requested <= max) {
                    return Err(ExlineError::TemperatureOutOfRange {
                        molecule: self.molecule.clone(),
                        isotope: self.isotopes[i].clone(),
                        requested,
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}
