//! # 同位素信息表
//!
//! ## 文件格式
//! ```text
//! # molID  molName  hitranIso  exomolIso  ratio         mass
//!   1      H2O      161        116        9.973173e-01  18.010565
//!   1      H2O      181        118        1.999827e-03  20.014811
//! ```
//! 同位素名称所在列因命名方式不同而不同：HITRAN 为第 2 列，ExoMol/Kurucz 为第 3 列（从 0 计数）。
//!
//! ## 依赖关系
//! - 被 `database/` 的各驱动在打开时调用
//! - 使用 `models/line.rs` 的 IsotopeInfo

use crate::error::{ExlineError, Result};
use crate::models::IsotopeInfo;

use std::fs;
use std::path::{Path, PathBuf};

/// 同位素命名方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsotopeNaming {
    Hitran,
    Exomol,
    Kurucz,
}

impl IsotopeNaming {
    /// 同位素名称所在列
    pub fn column(&self) -> usize {
        match self {
            IsotopeNaming::Hitran => 2,
            IsotopeNaming::Exomol | IsotopeNaming::Kurucz => 3,
        }
    }

    /// 由数据库类型名称解析（如文件名中的 `exomol`）
    pub fn from_dbtype(dbtype: &str) -> Option<Self> {
        match dbtype.to_lowercase().as_str() {
            "hitran" | "hitemp" => Some(IsotopeNaming::Hitran),
            "exomol" => Some(IsotopeNaming::Exomol),
            "kurucz" => Some(IsotopeNaming::Kurucz),
            _ => None,
        }
    }
}

/// 同位素表中的一行
#[derive(Debug, Clone)]
struct IsotopeRow {
    molecule_id: u32,
    molecule: String,
    names: [String; 2],
    ratio: f64,
    mass: f64,
}

/// 同位素信息表
#[derive(Debug, Clone)]
pub struct IsotopeTable {
    path: PathBuf,
    rows: Vec<IsotopeRow>,
}

impl IsotopeTable {
    /// 读取同位素信息表
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExlineError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| ExlineError::read(path, e))?;
        Self::parse(&content, path)
    }

    /// 从字符串内容解析
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let mut rows = Vec::new();
        for (lineno, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 6 {
                return Err(ExlineError::parse(
                    "isotopes",
                    path,
                    format!("Line {} has {} columns, expected 6", lineno + 1, fields.len()),
                ));
            }
            let number = |s: &str| {
                s.parse::<f64>().map_err(|e| {
                    ExlineError::parse(
                        "isotopes",
                        path,
                        format!("Invalid number '{}' at line {}: {}", s, lineno + 1, e),
                    )
                })
            };
            let molecule_id = fields[0].parse::<u32>().map_err(|e| {
                ExlineError::parse(
                    "isotopes",
                    path,
                    format!("Invalid molecule ID '{}' at line {}: {}", fields[0], lineno + 1, e),
                )
            })?;
            rows.push(IsotopeRow {
                molecule_id,
                molecule: fields[1].to_string(),
                names: [fields[2].to_string(), fields[3].to_string()],
                ratio: number(fields[4])?,
                mass: number(fields[5])?,
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// 由分子编号查找分子名称
    pub fn molecule_name(&self, molecule_id: u32) -> Option<&str> {
        self.rows
            .iter()
            .find(|r| r.molecule_id == molecule_id)
            .map(|r| r.molecule.as_str())
    }

    /// 分子的所有同位素（按表中顺序）
    pub fn isotopes_of(&self, molecule: &str, naming: IsotopeNaming) -> Result<Vec<IsotopeInfo>> {
        let column = naming.column() - 2;
        let isotopes: Vec<IsotopeInfo> = self
            .rows
            .iter()
            .filter(|r| r.molecule == molecule)
            .map(|r| IsotopeInfo {
                molecule_id: r.molecule_id,
                molecule: r.molecule.clone(),
                name: r.names[column].clone(),
                mass: r.mass,
                ratio: r.ratio,
            })
            .collect();

        if isotopes.is_empty() {
            return Err(ExlineError::Configuration(format!(
                "Molecule '{}' not found in isotope table '{}'",
                molecule,
                self.path.display()
            )));
        }
        Ok(isotopes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = r#"# molID molName hitranIso exomolIso ratio mass
  1  H2O  161  116  9.973173e-01  18.010565
  1  H2O  181  118  1.999827e-03  20.014811
  5  CO   26   26   9.865444e-01  27.994915
"#;

    #[test]
    fn test_naming_columns() {
        let table = IsotopeTable::parse(TABLE, Path::new("isotopes.dat")).unwrap();
        let hitran = table.isotopes_of("H2O", IsotopeNaming::Hitran).unwrap();
        let exomol = table.isotopes_of("H2O", IsotopeNaming::Exomol).unwrap();
        assert_eq!(hitran.len(), 2);
        assert_eq!(hitran[0].name, "161");
        assert_eq!(exomol[1].name, "118");
        assert_eq!(exomol[1].mass, 20.014811);
        assert_eq!(hitran[0].molecule_id, 1);
    }

    #[test]
    fn test_molecule_lookup() {
        let table = IsotopeTable::parse(TABLE, Path::new("isotopes.dat")).unwrap();
        assert_eq!(table.molecule_name(5), Some("CO"));
        assert_eq!(table.molecule_name(6), None);
        assert!(table.isotopes_of("CH4", IsotopeNaming::Hitran).is_err());
    }

    #[test]
    fn test_dbtype_naming() {
        assert_eq!(IsotopeNaming::from_dbtype("ExoMol"), Some(IsotopeNaming::Exomol));
        assert_eq!(IsotopeNaming::from_dbtype("hitran"), Some(IsotopeNaming::Hitran));
        assert_eq!(IsotopeNaming::from_dbtype("vald"), None);
    }
}
