//! # 配分函数表格文件读取
//!
//! ## 文件格式
//! ```text
//! # comment
//! @ISOTOPES
//!             161           181           171
//! # Temperature (K), partition function for each isotope:
//! @DATA
//!      70.0   2.1413e+01   2.1542e+01   1.2890e+02
//!      80.0   2.5979e+01   2.6137e+01   1.5639e+02
//! ```
//!
//! ## 依赖关系
//! - 被 `partition/mod.rs` 使用

use crate::error::{ExlineError, Result};

use ndarray::Array2;
use std::fs;
use std::path::Path;

/// 表格文件内容
#[derive(Debug, Clone)]
pub struct TabulatedPf {
    pub isotopes: Vec<String>,
    pub temperature: Vec<f64>,
    /// [isotope, temperature]
    pub values: Array2<f64>,
}

/// 读取配分函数表格文件
pub fn read_pf_file(path: &Path) -> Result<TabulatedPf> {
    if !path.exists() {
        return Err(ExlineError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| ExlineError::read(path, e))?;
    parse_pf_content(&content, path)
}

/// 从字符串内容解析配分函数表格
pub fn parse_pf_content(content: &str, path: &Path) -> Result<TabulatedPf> {
    let mut isotopes: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    let mut in_isotopes = false;
    let mut in_data = false;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line {
            "@ISOTOPES" => {
                in_isotopes = true;
                in_data = false;
                continue;
            }
            "@DATA" => {
                in_isotopes = false;
                in_data = true;
                continue;
            }
            _ => {}
        }

        if in_isotopes {
            isotopes.extend(line.split_whitespace().map(|s| s.to_string()));
        } else if in_data {
            let values: std::result::Result<Vec<f64>, _> =
                line.split_whitespace().map(|s| s.parse::<f64>()).collect();
            let values = values.map_err(|e| {
                ExlineError::parse(
                    "partition-function",
                    path,
                    format!("Invalid number at line {}: {}", lineno + 1, e),
                )
            })?;
            if values.len() != isotopes.len() + 1 {
                return Err(ExlineError::parse(
                    "partition-function",
                    path,
                    format!(
                        "Line {} has {} columns, expected {} (temperature + {} isotopes)",
                        lineno + 1,
                        values.len(),
                        isotopes.len() + 1,
                        isotopes.len()
                    ),
                ));
            }
            rows.push(values);
        } else {
            return Err(ExlineError::parse(
                "partition-function",
                path,
                format!("Unexpected content before @ISOTOPES at line {}", lineno + 1),
            ));
        }
    }

    if isotopes.is_empty() || rows.len() < 2 {
        return Err(ExlineError::parse(
            "partition-function",
            path,
            "Need an @ISOTOPES header and at least two @DATA rows",
        ));
    }

    let temperature: Vec<f64> = rows.iter().map(|r| r[0]).collect();
    let values = Array2::from_shape_fn((isotopes.len(), rows.len()), |(i, j)| rows[j][i + 1]);

    Ok(TabulatedPf {
        isotopes,
        temperature,
        values,
    })
}
