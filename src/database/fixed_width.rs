//! # 定宽 ASCII 数据库
//!
//! 每条记录占固定字节数，字段按列切片读取。记录可能按波数升序，
//! 也可能按波长 (µm) 升序排列（即波数降序），由 `SortKey` 指定。
//!
//! ## 预设格式
//! - Plez VO: 53 字节一条，gf `[21,32)`，波数 `[33,43)`，
//!   下能级 `[44,50)`（单位 eV），按波长升序
//!
//! ## 依赖关系
//! - 被 `database/mod.rs` 使用
//! - 使用 `partition/polynomial.rs` 的系数格式

use super::isotopes::IsotopeNaming;
use crate::constants::EV_TO_WAVENUMBER;
use crate::error::{ExlineError, Result};
use crate::models::IsotopeInfo;
use crate::partition::polynomial::NCOEFF;

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// 记录排序所用的关键字
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// 波数 (cm⁻¹) 升序
    Wavenumber,
    /// 波长 (µm) 升序
    Wavelength,
}

impl SortKey {
    /// 由波数换算为排序关键字
    pub fn key_of(&self, wavenumber: f64) -> f64 {
        match self {
            SortKey::Wavenumber => wavenumber,
            SortKey::Wavelength => 1.0e4 / wavenumber,
        }
    }

    /// 波数窗口换算为关键字窗口（保持 lo <= hi）
    pub fn window(&self, wn_min: f64, wn_max: f64) -> (f64, f64) {
        match self {
            SortKey::Wavenumber => (wn_min, wn_max),
            SortKey::Wavelength => (1.0e4 / wn_max, 1.0e4 / wn_min),
        }
    }
}

/// 定宽记录布局
#[derive(Debug, Clone)]
pub struct FixedWidthLayout {
    /// 格式名称
    pub name: String,
    /// 每条记录字节数（含换行）
    pub record_size: usize,
    pub molecule_id: Option<Range<usize>>,
    pub isotope: Option<Range<usize>>,
    pub wavenumber: Range<usize>,
    pub gf: Range<usize>,
    pub elow: Range<usize>,
    /// 下能级能量换算到 cm⁻¹ 的乘数
    pub elow_factor: f64,
    pub sort_key: SortKey,
    /// 查同位素表时使用的命名方式
    pub naming: IsotopeNaming,
    /// 格式固有的分子名
    pub molecule: Option<String>,
    /// 格式固有的同位素信息（存在时不查同位素表）
    pub isotopes: Option<Vec<IsotopeInfo>>,
    /// 各同位素 ln Q 多项式系数
    pub pf_coefficients: Option<Vec<[f64; NCOEFF]>>,
}

impl FixedWidthLayout {
    /// Plez VO 线表
    pub fn plez_vo() -> Self {
        Self {
            name: "Bertrand Plez VO".to_string(),
            record_size: 53,
            molecule_id: None,
            isotope: None,
            wavenumber: 33..43,
            gf: 21..32,
            elow: 44..50,
            elow_factor: EV_TO_WAVENUMBER,
            sort_key: SortKey::Wavelength,
            naming: IsotopeNaming::Hitran,
            molecule: Some("VO".to_string()),
            isotopes: Some(vec![IsotopeInfo {
                molecule_id: 0,
                molecule: "VO".to_string(),
                name: "16".to_string(),
                mass: 66.941,
                ratio: 1.0,
            }]),
            pf_coefficients: Some(vec![[
                6.62090157e+02,
                -4.03350494e+02,
                9.82836218e+01,
                -1.18526504e+01,
                7.08429905e-01,
                -1.67235124e-02,
            ]]),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut fields = vec![&self.wavenumber, &self.gf, &self.elow];
        fields.extend(self.molecule_id.iter());
        fields.extend(self.isotope.iter());
        for field in fields {
            if field.start >= field.end || field.end > self.record_size {
                return Err(ExlineError::Configuration(format!(
                    "Field {:?} of layout '{}' does not fit in a {}-byte record",
                    field, self.name, self.record_size
                )));
            }
        }
        Ok(())
    }
}

/// 一条定宽记录的解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct FixedWidthRecord {
    pub wavenumber: f64,
    /// 已换算为 cm⁻¹
    pub elow: f64,
    pub gf: f64,
    pub molecule_id: Option<u32>,
    pub isotope: Option<String>,
}

/// 定宽文件读取器
#[derive(Debug)]
pub struct FixedWidthReader {
    path: PathBuf,
    file: File,
    layout: FixedWidthLayout,
    nrecords: usize,
}

impl FixedWidthReader {
    pub fn open(path: &Path, layout: FixedWidthLayout) -> Result<Self> {
        layout.validate()?;
        if !path.exists() {
            return Err(ExlineError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let file = File::open(path).map_err(|e| ExlineError::read(path, e))?;
        let size = file
            .metadata()
            .map_err(|e| ExlineError::read(path, e))?
            .len() as usize;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            nrecords: size / layout.record_size,
            layout,
        })
    }

    pub fn layout(&self) -> &FixedWidthLayout {
        &self.layout
    }

    pub fn len(&self) -> usize {
        self.nrecords
    }

    pub fn is_empty(&self) -> bool {
        self.nrecords == 0
    }

    fn read_raw(&mut self, index: usize, field: Range<usize>) -> Result<String> {
        self.file
            .seek(SeekFrom::Start(
                (index * self.layout.record_size + field.start) as u64,
            ))
            .map_err(|e| ExlineError::read(&self.path, e))?;
        let mut buf = vec![0u8; field.len()];
        self.file
            .read_exact(&mut buf)
            .map_err(|e| ExlineError::read(&self.path, e))?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    fn parse_number(&self, text: &str, field: &str, index: usize) -> Result<f64> {
        text.trim().parse::<f64>().map_err(|e| {
            ExlineError::parse(
                &self.layout.name,
                &self.path,
                format!("Invalid {} '{}' in record {}: {}", field, text.trim(), index, e),
            )
        })
    }

    /// 随机读取第 `index` 条记录的波数
    pub fn read_wavenumber_at(&mut self, index: usize) -> Result<f64> {
        let text = self.read_raw(index, self.layout.wavenumber.clone())?;
        self.parse_number(&text, "wavenumber", index)
    }

    /// 随机读取第 `index` 条记录的排序关键字
    pub fn read_key_at(&mut self, index: usize) -> Result<f64> {
        let wavenumber = self.read_wavenumber_at(index)?;
        Ok(self.layout.sort_key.key_of(wavenumber))
    }

    /// 读取第 `index` 条完整记录
    pub fn read_record(&mut self, index: usize) -> Result<FixedWidthRecord> {
        let line = self.read_raw(index, 0..self.layout.record_size)?;
        let slice = |range: &Range<usize>| line.get(range.clone()).unwrap_or("");
        let layout = &self.layout;

        let wavenumber = self.parse_number(slice(&layout.wavenumber), "wavenumber", index)?;
        let gf = self.parse_number(slice(&layout.gf), "gf", index)?;
        let elow = self.parse_number(slice(&layout.elow), "elow", index)? * layout.elow_factor;
        let molecule_id = match &layout.molecule_id {
            Some(range) => Some(slice(range).trim().parse::<u32>().map_err(|e| {
                ExlineError::parse(
                    &layout.name,
                    &self.path,
                    format!("Invalid molecule ID in record {}: {}", index, e),
                )
            })?),
            None => None,
        };
        let isotope = layout
            .isotope
            .as_ref()
            .map(|range| slice(range).trim().to_string());

        Ok(FixedWidthRecord {
            wavenumber,
            elow,
            gf,
            molecule_id,
            isotope,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    /// 生成一条 53 字节的 Plez VO 记录
    pub(crate) fn plez_line(wavenumber: f64, gf: f64, elow_ev: f64) -> String {
        let wavelength_a = 1.0e8 / wavenumber;
        let line = format!(
            "{:>12.3}{:>8}{:>12.5e}{:>1}{:>10.3}{:>1}{:>6.4}{:>2}",
            wavelength_a, "", gf, "", wavenumber, "", elow_ev, ""
        );
        let mut line = line;
        line.truncate(52);
        line.push('\n');
        line
    }

    pub(crate) fn write_plez(path: &Path, wavenumbers_desc: &[f64]) {
        let mut file = File::create(path).unwrap();
        for (i, &wn) in wavenumbers_desc.iter().enumerate() {
            file.write_all(plez_line(wn, 1e-3 * (i + 1) as f64, 0.5).as_bytes())
                .unwrap();
        }
    }

    #[test]
    fn test_plez_line_geometry() {
        let line = plez_line(12345.678, 2.5e-3, 0.25);
        assert_eq!(line.len(), 53);
        assert_eq!(line[33..43].trim().parse::<f64>().unwrap(), 12345.678);
        assert_eq!(line[21..32].trim().parse::<f64>().unwrap(), 2.5e-3);
        assert_eq!(line[44..50].trim().parse::<f64>().unwrap(), 0.25);
    }

    #[test]
    fn test_read_record_converts_units() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("VO_plez.dat");
        write_plez(&path, &[12000.0, 11000.0, 10000.0]);

        let mut reader = FixedWidthReader::open(&path, FixedWidthLayout::plez_vo()).unwrap();
        assert_eq!(reader.len(), 3);
        let rec = reader.read_record(1).unwrap();
        assert_eq!(rec.wavenumber, 11000.0);
        assert!((rec.elow - 0.5 * EV_TO_WAVENUMBER).abs() < 1e-9);
        assert!((rec.gf - 2e-3).abs() < 1e-12);
        assert_eq!(rec.isotope, None);

        // 波长关键字随记录索引递增
        let k0 = reader.read_key_at(0).unwrap();
        let k2 = reader.read_key_at(2).unwrap();
        assert!(k0 < k2);
        assert!((k2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_key_window() {
        let (lo, hi) = SortKey::Wavelength.window(5000.0, 10000.0);
        assert_eq!((lo, hi), (1.0, 2.0));
        assert_eq!(SortKey::Wavenumber.window(1.0, 2.0), (1.0, 2.0));
    }

    #[test]
    fn test_invalid_layout() {
        let mut layout = FixedWidthLayout::plez_vo();
        layout.elow = 44..60;
        let dir = tempdir().unwrap();
        let path = dir.path().join("VO_plez.dat");
        write_plez(&path, &[12000.0]);
        assert!(matches!(
            FixedWidthReader::open(&path, layout),
            Err(ExlineError::Configuration(_))
        ));
    }
}
