//! # 二进制 repack 数据库
//!
//! ## 记录格式（小端序，每条 28 字节）
//! | 偏移 | 类型 | 字段 |
//! |------|------|------|
//! | 0    | f64  | 波数 (cm⁻¹) |
//! | 8    | f64  | 下能级能量 (cm⁻¹) |
//! | 16   | f64  | gf |
//! | 24   | i32  | 同位素编号 |
//!
//! 记录按波数升序排列。文件名形如 `<molecule>_<dbtype>_...`，
//! 分子名和数据库类型从中解析。
//!
//! ## 依赖关系
//! - 被 `database/mod.rs` 使用
//! - 使用 `regex` 解析文件名

use crate::error::{ExlineError, Result};

use regex::Regex;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// 每条记录的字节数
pub const RECORD_SIZE: usize = 28;

static FILE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<molecule>[A-Za-z0-9+\-]+)_(?P<dbtype>[A-Za-z]+)(?:_|\.|$)")
        .expect("valid file-name pattern")
});

/// 一条未解析同位素的 repack 记录
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepackRecord {
    pub wavenumber: f64,
    pub elow: f64,
    pub gf: f64,
    pub isotope: i32,
}

impl RepackRecord {
    fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        let f64_at = |offset: usize| {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&buf[offset..offset + 8]);
            f64::from_le_bytes(bytes)
        };
        let mut iso = [0u8; 4];
        iso.copy_from_slice(&buf[24..28]);
        Self {
            wavenumber: f64_at(0),
            elow: f64_at(8),
            gf: f64_at(16),
            isotope: i32::from_le_bytes(iso),
        }
    }

    #[cfg(test)]
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..8].copy_from_slice(&self.wavenumber.to_le_bytes());
        buf[8..16].copy_from_slice(&self.elow.to_le_bytes());
        buf[16..24].copy_from_slice(&self.gf.to_le_bytes());
        buf[24..28].copy_from_slice(&self.isotope.to_le_bytes());
        buf
    }
}

/// 从文件名解析 (分子, 数据库类型)
pub fn parse_file_name(path: &Path) -> Option<(String, String)> {
    let name = path.file_name()?.to_str()?;
    let caps = FILE_NAME_RE.captures(name)?;
    Some((caps["molecule"].to_string(), caps["dbtype"].to_lowercase()))
}

/// repack 文件读取器
#[derive(Debug)]
pub struct RepackReader {
    path: PathBuf,
    file: File,
    nrecords: usize,
}

impl RepackReader {
    pub fn open(path: &Path) -> Result<Self> {
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
        if size % RECORD_SIZE != 0 {
            return Err(ExlineError::parse(
                "repack",
                path,
                format!(
                    "File size {} is not a multiple of the {}-byte record size",
                    size, RECORD_SIZE
                ),
            ));
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            nrecords: size / RECORD_SIZE,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.nrecords
    }

    pub fn is_empty(&self) -> bool {
        self.nrecords == 0
    }

    fn seek(&mut self, index: usize, offset: usize) -> Result<()> {
        self.file
            .seek(SeekFrom::Start((index * RECORD_SIZE + offset) as u64))
            .map_err(|e| ExlineError::read(&self.path, e))?;
        Ok(())
    }

    /// 随机读取第 `index` 条记录的波数
    pub fn read_wavenumber_at(&mut self, index: usize) -> Result<f64> {
        self.seek(index, 0)?;
        let mut bytes = [0u8; 8];
        self.file
            .read_exact(&mut bytes)
            .map_err(|e| ExlineError::read(&self.path, e))?;
        Ok(f64::from_le_bytes(bytes))
    }

    /// 顺序读取 `[start, stop]` 的记录，每读一条调用一次 `visit`
    pub fn for_each_in<F>(&mut self, start: usize, stop: usize, mut visit: F) -> Result<()>
    where
        F: FnMut(usize, RepackRecord) -> Result<()>,
    {
        if stop < start {
            return Ok(());
        }
        self.seek(start, 0)?;
        let path = self.path.clone();
        let mut reader = BufReader::new(&mut self.file);
        let mut buf = [0u8; RECORD_SIZE];
        for i in 0..=(stop - start) {
            reader
                .read_exact(&mut buf)
                .map_err(|e| ExlineError::read(&path, e))?;
            visit(i, RepackRecord::from_bytes(&buf))?;
        }
        Ok(())
    }
}

/// 写出 repack 文件（测试与数据准备用）
#[cfg(test)]
pub fn write_repack(path: &Path, records: &[RepackRecord]) -> Result<()> {
    use std::io::Write;
    let mut file = File::create(path).map_err(|e| ExlineError::write(path, e))?;
    for rec in records {
        file.write_all(&rec.to_bytes())
            .map_err(|e| ExlineError::write(path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_file_name() {
        assert_eq!(
            parse_file_name(Path::new("/data/H2O_exomol_pokazatel_1-2um.bin")),
            Some(("H2O".to_string(), "exomol".to_string()))
        );
        assert_eq!(
            parse_file_name(Path::new("CO_hitran.bin")),
            Some(("CO".to_string(), "hitran".to_string()))
        );
        assert_eq!(parse_file_name(Path::new("lines.bin")), None);
    }

    #[test]
    fn test_record_layout() {
        let rec = RepackRecord {
            wavenumber: 1234.5,
            elow: 10.0,
            gf: 1e-3,
            isotope: 161,
        };
        let bytes = rec.to_bytes();
        assert_eq!(&bytes[0..8], &1234.5f64.to_le_bytes());
        assert_eq!(&bytes[24..28], &161i32.to_le_bytes());
        assert_eq!(RepackRecord::from_bytes(&bytes), rec);
    }

    #[test]
    fn test_random_and_sequential_access() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CO_hitran_test.bin");
        let records: Vec<RepackRecord> = (0..5)
            .map(|i| RepackRecord {
                wavenumber: 100.0 + i as f64,
                elow: i as f64,
                gf: 0.1,
                isotope: 26,
            })
            .collect();
        write_repack(&path, &records).unwrap();

        let mut reader = RepackReader::open(&path).unwrap();
        assert_eq!(reader.len(), 5);
        assert_eq!(reader.read_wavenumber_at(3).unwrap(), 103.0);

        let mut seen = Vec::new();
        reader
            .for_each_in(1, 3, |i, rec| {
                seen.push((i, rec.elow));
                Ok(())
            })
            .unwrap();
        assert_eq!(seen, vec![(0, 1.0), (1, 2.0), (2, 3.0)]);
    }

    #[test]
    fn test_truncated_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("CO_hitran_bad.bin");
        std::fs::write(&path, [0u8; 30]).unwrap();
        assert!(matches!(
            RepackReader::open(&path),
            Err(ExlineError::ParseError { .. })
        ));
    }
}
