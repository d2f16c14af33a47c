//! # 大气剖面数据模型与读取
//!
//! 大气剖面由外部工具生成，这里只读取消光计算需要的量：
//! 每层的压力、温度、体积混合比，以及由理想气体定律得到的数密度。
//!
//! ## 文件格式
//! ```text
//! # comment
//! @PRESSURE
//! bar
//! @SPECIES
//! H2  He  H2O  CO
//! @DATA
//! # pressure  temperature  vmr(H2)  vmr(He)  vmr(H2O)  vmr(CO)
//! 1.0e-06  1200.0  0.85  0.149  4.0e-04  6.0e-04
//! ...
//! ```
//! 压力单位可选 `bar`（默认）或 `barye`。
//!
//! ## 依赖关系
//! - 被 `extinction/` 和 `commands/` 使用
//! - 使用 `models/molecules.rs` 获取分子质量和碰撞半径

use crate::constants::{ANGSTROM, BAR, BOLTZMANN};
use crate::error::{ExlineError, Result};
use crate::models::molecules;

use ndarray::Array2;
use std::fs;
use std::path::Path;

/// 大气中的物种
#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub name: String,
    /// 质量 (amu)
    pub mass: f64,
    /// 碰撞半径 (cm)
    pub radius: f64,
}

/// 大气剖面
#[derive(Debug, Clone)]
pub struct Atmosphere {
    pub species: Vec<Species>,
    /// 各层压力 (barye)
    pub pressure: Vec<f64>,
    /// 各层温度 (K)
    pub temperature: Vec<f64>,
    /// 体积混合比 [layer, species]
    pub vmr: Array2<f64>,
    /// 数密度 (molecules cm⁻³) [layer, species]
    pub density: Array2<f64>,
}

impl Atmosphere {
    /// 由各层压力 (barye)、温度和混合比构造，数密度按理想气体计算
    pub fn new(
        species: Vec<Species>,
        pressure: Vec<f64>,
        temperature: Vec<f64>,
        vmr: Array2<f64>,
    ) -> Result<Self> {
        let nlayers = pressure.len();
        if temperature.len() != nlayers || vmr.nrows() != nlayers {
            return Err(ExlineError::Configuration(format!(
                "Atmosphere arrays disagree: {} pressures, {} temperatures, {} abundance rows",
                nlayers,
                temperature.len(),
                vmr.nrows()
            )));
        }
        if vmr.ncols() != species.len() {
            return Err(ExlineError::Configuration(format!(
                "Atmosphere has {} species but {} abundance columns",
                species.len(),
                vmr.ncols()
            )));
        }
        if let Some(p) = pressure.iter().find(|p| !(**p > 0.0)) {
            return Err(ExlineError::Configuration(format!(
                "Atmosphere pressure must be positive (got {} barye)",
                p
            )));
        }
        if let Some(t) = temperature.iter().find(|t| !(**t > 0.0)) {
            return Err(ExlineError::Configuration(format!(
                "Atmosphere temperature must be positive (got {} K)",
                t
            )));
        }

        let mut density = vmr.clone();
        for (ilayer, mut row) in density.rows_mut().into_iter().enumerate() {
            let total = pressure[ilayer] / (BOLTZMANN * temperature[ilayer]);
            row.mapv_inplace(|q| q * total);
        }

        Ok(Self {
            species,
            pressure,
            temperature,
            vmr,
            density,
        })
    }

    pub fn nlayers(&self) -> usize {
        self.pressure.len()
    }

    /// 物种在大气中的索引
    pub fn species_index(&self, name: &str) -> Option<usize> {
        self.species.iter().position(|s| s.name == name)
    }

    /// 物种名称列表
    pub fn species_names(&self) -> Vec<String> {
        self.species.iter().map(|s| s.name.clone()).collect()
    }
}

/// 由名称构造物种（从分子物性数据库取质量与半径）
pub fn species_from_name(name: &str) -> Result<Species> {
    let props = molecules::lookup(name).ok_or_else(|| {
        ExlineError::Configuration(format!(
            "Unknown species '{}': no mass/radius available for broadening",
            name
        ))
    })?;
    Ok(Species {
        name: name.to_string(),
        mass: props.mass,
        radius: props.radius * ANGSTROM,
    })
}

/// 读取大气文件
pub fn read_atmosphere(path: &Path) -> Result<Atmosphere> {
    if !path.exists() {
        return Err(ExlineError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| ExlineError::read(path, e))?;
    parse_atmosphere(&content, path)
}

/// 从字符串内容解析大气文件
pub fn parse_atmosphere(content: &str, path: &Path) -> Result<Atmosphere> {
    #[derive(PartialEq)]
    enum Section {
        None,
        Pressure,
        Species,
        Data,
    }

    let mut section = Section::None;
    let mut pressure_unit = BAR;
    let mut names: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(tag) = line.strip_prefix('@') {
            section = match tag.to_uppercase().as_str() {
                "PRESSURE" => Section::Pressure,
                "SPECIES" => Section::Species,
                "DATA" => Section::Data,
                other => {
                    return Err(ExlineError::parse(
                        "atmosphere",
                        path,
                        format!("Unknown section '@{}' at line {}", other, lineno + 1),
                    ))
                }
            };
            continue;
        }

        match section {
            Section::Pressure => {
                pressure_unit = match line.to_lowercase().as_str() {
                    "bar" => BAR,
                    "barye" => 1.0,
                    other => {
                        return Err(ExlineError::parse(
                            "atmosphere",
                            path,
                            format!("Unsupported pressure unit '{}'", other),
                        ))
                    }
                };
            }
            Section::Species => {
                names.extend(line.split_whitespace().map(|s| s.to_string()));
            }
            Section::Data => {
                let values: std::result::Result<Vec<f64>, _> =
                    line.split_whitespace().map(|s| s.parse::<f64>()).collect();
                let values = values.map_err(|e| {
                    ExlineError::parse(
                        "atmosphere",
                        path,
                        format!("Invalid number at line {}: {}", lineno + 1, e),
                    )
                })?;
                if values.len() != names.len() + 2 {
                    return Err(ExlineError::parse(
                        "atmosphere",
                        path,
                        format!(
                            "Line {} has {} columns, expected {} (pressure, temperature, {} abundances)",
                            lineno + 1,
                            values.len(),
                            names.len() + 2,
                            names.len()
                        ),
                    ));
                }
                rows.push(values);
            }
            Section::None => {
                return Err(ExlineError::parse(
                    "atmosphere",
                    path,
                    format!("Data before any '@' section at line {}", lineno + 1),
                ))
            }
        }
    }

    if names.is_empty() || rows.is_empty() {
        return Err(ExlineError::parse(
            "atmosphere",
            path,
            "Missing @SPECIES or @DATA section",
        ));
    }

    let species = names
        .iter()
        .map(|n| species_from_name(n))
        .collect::<Result<Vec<_>>>()?;

    let nlayers = rows.len();
    let nspec = names.len();
    let pressure: Vec<f64> = rows.iter().map(|r| r[0] * pressure_unit).collect();
    let temperature: Vec<f64> = rows.iter().map(|r| r[1]).collect();
    let vmr = Array2::from_shape_fn((nlayers, nspec), |(i, j)| rows[i][j + 2]);

    Atmosphere::new(species, pressure, temperature, vmr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ATM: &str = r#"# test atmosphere
@PRESSURE
bar
@SPECIES
H2 He H2O
@DATA
1.0e-03  1000.0  0.85  0.149  1.0e-03
1.0e+00  1500.0  0.85  0.149  1.0e-03
"#;

    #[test]
    fn test_parse_atmosphere() {
        let atm = parse_atmosphere(ATM, Path::new("test.atm")).unwrap();
        assert_eq!(atm.nlayers(), 2);
        assert_eq!(atm.species_names(), vec!["H2", "He", "H2O"]);
        assert_relative_eq!(atm.pressure[1], 1.0e6);
        assert_relative_eq!(atm.species[0].radius, 1.445e-8);

        // n = p q / (k T)
        let expected = 1.0e6 * 1.0e-3 / (BOLTZMANN * 1500.0);
        assert_relative_eq!(atm.density[[1, 2]], expected, max_relative = 1e-12);
        assert_eq!(atm.species_index("H2O"), Some(2));
    }

    #[test]
    fn test_unknown_species_rejected() {
        let content = ATM.replace("H2O", "XyZ");
        let err = parse_atmosphere(&content, Path::new("bad.atm")).unwrap_err();
        assert!(err.to_string().contains("XyZ"));
    }

    #[test]
    fn test_wrong_column_count() {
        let content = ATM.replace("1.0e+00  1500.0  0.85  0.149  1.0e-03", "1.0 1500.0 0.85");
        assert!(parse_atmosphere(&content, Path::new("bad.atm")).is_err());
    }
}
