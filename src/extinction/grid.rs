//! # 不透明度表
//!
//! 四维截面表 `[species, temperature, layer, wavenumber]` (cm² molecule⁻¹)。
//!
//! ## 内存布局
//! 按单元存储 `(temperature, layer, species, wavenumber)`：每个 (温度, 层) 单元的
//! `nspec × nwave` 数值连续，便于切分成互不重叠的可变切片交给 worker；
//! `coefficients()` 返回按 `[species, temperature, layer, wavenumber]` 排列的视图。
//!
//! ## 文件格式（小端序）
//! ```text
//! magic      8 bytes  "EXLNOPAC"
//! version    u32
//! nspec, ntemp, nlayers, nwave   u64 × 4
//! species    (u32 长度 + UTF-8 字节) × nspec
//! temperature   f64 × ntemp    (K)
//! pressure      f64 × nlayers  (barye)
//! wavenumber    f64 × nwave    (cm⁻¹)
//! coefficients  f64 × (nspec·ntemp·nlayers·nwave)，[species, temperature, layer, wavenumber] 顺序
//! ```
//!
//! ## 依赖关系
//! - 被 `extinction/builder.rs` 构造，被 `commands/inspect.rs` 读取
//! - 使用 `ndarray` 存储

use crate::error::{ExlineError, Result};

use ndarray::{Array4, ArrayView2, ArrayView4, Axis};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

/// 文件魔数
pub const MAGIC: &[u8; 8] = b"EXLNOPAC";
/// 文件格式版本
pub const VERSION: u32 = 1;

/// 截面表
#[derive(Debug, Clone, PartialEq)]
pub struct OpacityGrid {
    species: Vec<String>,
    temperature: Vec<f64>,
    /// barye
    pressure: Vec<f64>,
    wavenumber: Vec<f64>,
    /// (temperature, layer, species, wavenumber)
    cells: Array4<f64>,
}

impl OpacityGrid {
    /// 分配全零的表
    pub fn zeros(
        species: Vec<String>,
        temperature: Vec<f64>,
        pressure: Vec<f64>,
        wavenumber: Vec<f64>,
    ) -> Self {
        let cells = Array4::zeros((
            temperature.len(),
            pressure.len(),
            species.len(),
            wavenumber.len(),
        ));
        Self {
            species,
            temperature,
            pressure,
            wavenumber,
            cells,
        }
    }

    pub fn species(&self) -> &[String] {
        &self.species
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn pressure(&self) -> &[f64] {
        &self.pressure
    }

    pub fn wavenumber(&self) -> &[f64] {
        &self.wavenumber
    }

    /// (nspec, ntemp, nlayers, nwave)
    pub fn dims(&self) -> (usize, usize, usize, usize) {
        (
            self.species.len(),
            self.temperature.len(),
            self.pressure.len(),
            self.wavenumber.len(),
        )
    }

    /// 单元数 ntemp × nlayers
    pub fn ncells(&self) -> usize {
        self.temperature.len() * self.pressure.len()
    }

    /// `[species, temperature, layer, wavenumber]` 视图
    pub fn coefficients(&self) -> ArrayView4<'_, f64> {
        self.cells.view().permuted_axes([2, 0, 1, 3])
    }

    /// 一个单元的 `[species, wavenumber]` 视图
    pub fn cell(&self, itemp: usize, ilayer: usize) -> ArrayView2<'_, f64> {
        self.cells
            .index_axis(Axis(0), itemp)
            .index_axis_move(Axis(0), ilayer)
    }

    /// 按单元编号 `itemp · nlayers + ilayer` 切分的互不重叠可变切片
    pub fn cells_mut(&mut self) -> Result<Vec<&mut [f64]>> {
        let chunk = self.species.len() * self.wavenumber.len();
        let ncells = self.ncells();
        if chunk == 0 {
            return Ok((0..ncells).map(|_| <&mut [f64]>::default()).collect());
        }
        let data = self.cells.as_slice_mut().ok_or_else(|| {
            ExlineError::Other("Opacity table storage is not contiguous".to_string())
        })?;
        Ok(data.chunks_mut(chunk).collect())
    }

    /// 写出到文件
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ExlineError::write(parent, e))?;
            }
        }
        let file = File::create(path).map_err(|e| ExlineError::write(path, e))?;
        let mut w = BufWriter::new(file);
        let io = |e| ExlineError::write(path, e);

        w.write_all(MAGIC).map_err(io)?;
        w.write_all(&VERSION.to_le_bytes()).map_err(io)?;
        let (nspec, ntemp, nlayers, nwave) = self.dims();
        for n in [nspec, ntemp, nlayers, nwave] {
            w.write_all(&(n as u64).to_le_bytes()).map_err(io)?;
        }
        for name in &self.species {
            w.write_all(&(name.len() as u32).to_le_bytes()).map_err(io)?;
            w.write_all(name.as_bytes()).map_err(io)?;
        }
        for axis in [&self.temperature, &self.pressure, &self.wavenumber] {
            for v in axis.iter() {
                w.write_all(&v.to_le_bytes()).map_err(io)?;
            }
        }
        for v in self.coefficients().iter() {
            w.write_all(&v.to_le_bytes()).map_err(io)?;
        }
        w.flush().map_err(io)?;
        Ok(())
    }

    /// 从文件读取
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ExlineError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let bytes = fs::read(path).map_err(|e| ExlineError::read(path, e))?;
        let mut r = ByteReader {
            bytes: &bytes,
            pos: 0,
            path,
        };

        if r.take(MAGIC.len())? != MAGIC {
            return Err(r.corrupt("not an opacity table (bad magic)"));
        }
        let version = r.u32()?;
        if version != VERSION {
            return Err(r.corrupt(&format!(
                "unsupported version {} (expected {})",
                version, VERSION
            )));
        }
        let nspec = r.u64()? as usize;
        let ntemp = r.u64()? as usize;
        let nlayers = r.u64()? as usize;
        let nwave = r.u64()? as usize;

        let mut species = Vec::with_capacity(nspec.min(1024));
        for _ in 0..nspec {
            let len = r.u32()? as usize;
            let name = std::str::from_utf8(r.take(len)?)
                .map_err(|e| r.corrupt(&format!("invalid species name: {}", e)))?;
            species.push(name.to_string());
        }
        let temperature = r.f64s(ntemp)?;
        let pressure = r.f64s(nlayers)?;
        let wavenumber = r.f64s(nwave)?;

        let total = nspec
            .checked_mul(ntemp)
            .and_then(|n| n.checked_mul(nlayers))
            .and_then(|n| n.checked_mul(nwave))
            .ok_or_else(|| r.corrupt("dimensions overflow"))?;
        let values = r.f64s(total)?;
        if r.pos != bytes.len() {
            return Err(r.corrupt(&format!(
                "{} trailing bytes after coefficients",
                bytes.len() - r.pos
            )));
        }

        let logical = Array4::from_shape_vec((nspec, ntemp, nlayers, nwave), values)
            .map_err(|e| r.corrupt(&e.to_string()))?;
        let cells = logical
            .permuted_axes([1, 2, 0, 3])
            .as_standard_layout()
            .into_owned();

        Ok(Self {
            species,
            temperature,
            pressure,
            wavenumber,
            cells,
        })
    }
}

/// 按顺序解析字节
struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> ByteReader<'a> {
    fn corrupt(&self, reason: &str) -> ExlineError {
        ExlineError::CorruptTable {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| {
                self.corrupt(&format!(
                    "unexpected end of file at byte {} (needed {} more)",
                    self.pos, n
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn f64s(&mut self, n: usize) -> Result<Vec<f64>> {
        let nbytes = n
            .checked_mul(8)
            .ok_or_else(|| self.corrupt("dimensions overflow"))?;
        Ok(self
            .take(nbytes)?
            .chunks_exact(8)
            .map(|c| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(c);
                f64::from_le_bytes(buf)
            })
            .collect())
    }
}
