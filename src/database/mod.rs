//! # 谱线数据库模块
//!
//! 对外提供统一的数据库接口：随机读取波数、按波数窗口定位记录区间、
//! 顺序读取记录、构造配分函数表。
//!
//! ## 驱动
//! - `repack`: 二进制 repack 格式（按波数升序）
//! - `fixed_width`: 定宽 ASCII 格式（按波数或波长升序，含 Plez VO 预设）
//!
//! ## 区间语义
//! 窗口 `[wn_min, wn_max]` 两端都包含。窗口与文件完全不重叠时返回
//! `RangeQuery::NotCovered`（可恢复的警告），不是错误。
//!
//! ## 依赖关系
//! - 被 `extinction/` 和 `commands/` 使用
//! - 使用 `partition/` 构造配分函数表
//! - 子模块: search, isotopes, repack, fixed_width

pub mod fixed_width;
pub mod isotopes;
pub mod repack;
pub mod search;

use crate::error::{ExlineError, Result};
use crate::models::{IsotopeInfo, LineRecord};
use crate::partition::{
    builtin, polynomial, tabulated, temperature_grid, PartitionFunctionTable, PfSource,
};
use crate::utils::Log;
use fixed_width::{FixedWidthLayout, FixedWidthReader, SortKey};
use isotopes::{IsotopeNaming, IsotopeTable};
use repack::RepackReader;
use search::{bounded_search, SearchDirection};

use indicatif::ProgressBar;
use ndarray::Array2;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

// ─────────────────────────────────────────────────────────────
// 配置
// ─────────────────────────────────────────────────────────────

/// 数据库文件格式
#[derive(Debug, Clone)]
pub enum DatabaseFormat {
    Repack,
    FixedWidth(FixedWidthLayout),
}

impl DatabaseFormat {
    /// 按名称解析：`repack`、`plez-vo`
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "repack" => Ok(DatabaseFormat::Repack),
            "plez-vo" | "voplez" | "vo" => Ok(DatabaseFormat::FixedWidth(FixedWidthLayout::plez_vo())),
            other => Err(ExlineError::UnsupportedFormat(format!(
                "Unknown line-database format '{}'. Supported: repack, plez-vo",
                other
            ))),
        }
    }
}

/// 一个数据库的打开参数
#[derive(Debug, Clone)]
pub struct DatabaseSpec {
    pub path: PathBuf,
    pub format: DatabaseFormat,
    pub pf: PfSource,
    /// 显式指定的分子名（优先于文件名/记录中的信息）
    pub molecule: Option<String>,
}

impl DatabaseSpec {
    pub fn new(path: impl Into<PathBuf>, format: DatabaseFormat, pf: PfSource) -> Self {
        Self {
            path: path.into(),
            format,
            pf,
            molecule: None,
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 区间查询结果
// ─────────────────────────────────────────────────────────────

/// 记录索引闭区间 `[start, stop]`，`stop < start` 表示空区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: usize,
    pub stop: usize,
}

impl LineRange {
    pub fn len(&self) -> usize {
        if self.stop < self.start {
            0
        } else {
            self.stop - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.stop < self.start
    }
}

/// 请求窗口与数据库不重叠
#[derive(Debug, Clone, PartialEq)]
pub struct RangeNotCoveredWarning {
    pub database: String,
    pub db_min: f64,
    pub db_max: f64,
    pub req_min: f64,
    pub req_max: f64,
}

impl fmt::Display for RangeNotCoveredWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Database ('{}') wavenumber range ({:.2}--{:.2} cm-1) does not overlap with the \
             requested wavenumber range ({:.2}--{:.2} cm-1).",
            self.database, self.db_min, self.db_max, self.req_min, self.req_max
        )
    }
}

/// 窗口查询结果
#[derive(Debug, Clone, PartialEq)]
pub enum RangeQuery {
    Covered(LineRange),
    NotCovered(RangeNotCoveredWarning),
}

// ─────────────────────────────────────────────────────────────
// 读取进度观察者
// ─────────────────────────────────────────────────────────────

/// 顺序读取时约每 10% 收到一次通知
pub trait ReadObserver {
    fn started(&self, _database: &str, _range: LineRange) {}

    /// `done` 为已读记录数，`record` 为刚读到的记录
    fn checkpoint(&self, done: usize, total: usize, record: &LineRecord);

    fn finished(&self, _nread: usize) {}
}

impl ReadObserver for Log {
    fn started(&self, database: &str, range: LineRange) {
        self.msg(
            &format!(
                "Process {} database between records {} and {}.",
                database, range.start, range.stop
            ),
            2,
        );
    }

    fn checkpoint(&self, done: usize, total: usize, record: &LineRecord) {
        self.msg(
            &format!("{:5.1}% completed.", 100.0 * done as f64 / total as f64),
            3,
        );
        self.debug(
            &format!(
                "Wavenumber: {:8.2} cm-1   Wavelength: {:6.3} um   Elow: {:.4e} cm-1   \
                 gf: {:.4e}   Iso ID: {:2}",
                record.wavenumber,
                1.0e4 / record.wavenumber,
                record.elow,
                record.gf,
                record.isotope
            ),
            6,
        );
    }
}

impl ReadObserver for ProgressBar {
    fn started(&self, database: &str, range: LineRange) {
        self.set_length(range.len() as u64);
        self.set_position(0);
        self.set_message(database.to_string());
    }

    fn checkpoint(&self, done: usize, _total: usize, _record: &LineRecord) {
        self.set_position(done as u64);
    }

    fn finished(&self, nread: usize) {
        self.set_position(nread as u64);
    }
}

// ─────────────────────────────────────────────────────────────
// 数据库
// ─────────────────────────────────────────────────────────────

#[derive(Debug)]
enum Driver {
    Repack {
        reader: RepackReader,
        /// 文件中的同位素编号 → 同位素列表索引
        isotope_index: HashMap<i32, usize>,
    },
    FixedWidth(FixedWidthReader),
}

/// 打开的谱线数据库
#[derive(Debug)]
pub struct LineDatabase {
    name: String,
    path: PathBuf,
    molecule: String,
    isotopes: Vec<IsotopeInfo>,
    pf_source: PfSource,
    driver: Driver,
}

impl LineDatabase {
    /// 打开数据库并解析分子与同位素信息
    pub fn open(spec: &DatabaseSpec, isotope_table: Option<&IsotopeTable>) -> Result<Self> {
        match &spec.format {
            DatabaseFormat::Repack => Self::open_repack(spec, isotope_table),
            DatabaseFormat::FixedWidth(layout) => {
                Self::open_fixed_width(spec, layout.clone(), isotope_table)
            }
        }
    }

    fn open_repack(spec: &DatabaseSpec, isotope_table: Option<&IsotopeTable>) -> Result<Self> {
        let reader = RepackReader::open(&spec.path)?;
        let (file_molecule, dbtype) = repack::parse_file_name(&spec.path).ok_or_else(|| {
            ExlineError::Configuration(format!(
                "Cannot infer molecule and database type from file name '{}' \
                 (expected <molecule>_<dbtype>_...)",
                spec.path.display()
            ))
        })?;
        let naming = IsotopeNaming::from_dbtype(&dbtype).ok_or_else(|| {
            ExlineError::Configuration(format!(
                "Unknown database type '{}' in file name '{}'",
                dbtype,
                spec.path.display()
            ))
        })?;
        let molecule = spec.molecule.clone().unwrap_or(file_molecule);
        let table = isotope_table.ok_or_else(|| ExlineError::MissingParameter {
            name: "isotopes".to_string(),
            purpose: format!("isotope metadata for repack database '{}'", spec.path.display()),
        })?;
        let isotopes = table.isotopes_of(&molecule, naming)?;

        let mut isotope_index = HashMap::new();
        for (i, iso) in isotopes.iter().enumerate() {
            if let Ok(id) = iso.name.parse::<i32>() {
                isotope_index.insert(id, i);
            }
        }

        Ok(Self {
            name: format!("repack {} {}", dbtype, molecule),
            path: spec.path.clone(),
            molecule,
            isotopes,
            pf_source: spec.pf.clone(),
            driver: Driver::Repack {
                reader,
                isotope_index,
            },
        })
    }

    fn open_fixed_width(
        spec: &DatabaseSpec,
        layout: FixedWidthLayout,
        isotope_table: Option<&IsotopeTable>,
    ) -> Result<Self> {
        let mut reader = FixedWidthReader::open(&spec.path, layout.clone())?;

        let mut molecule = spec.molecule.clone().or_else(|| layout.molecule.clone());
        if molecule.is_none() && layout.molecule_id.is_some() && !reader.is_empty() {
            if let (Some(id), Some(table)) = (reader.read_record(0)?.molecule_id, isotope_table) {
                molecule = table.molecule_name(id).map(str::to_string);
            }
        }
        let molecule = molecule.ok_or_else(|| {
            ExlineError::Configuration(format!(
                "Cannot resolve the molecule of database '{}': no molecule name given \
                 and no molecule ID found in the records",
                spec.path.display()
            ))
        })?;

        let isotopes = match (&layout.isotopes, isotope_table) {
            (Some(isotopes), _) => isotopes.clone(),
            (None, Some(table)) => table.isotopes_of(&molecule, layout.naming)?,
            (None, None) => {
                return Err(ExlineError::MissingParameter {
                    name: "isotopes".to_string(),
                    purpose: format!("isotope metadata for database '{}'", spec.path.display()),
                })
            }
        };

        Ok(Self {
            name: layout.name.clone(),
            path: spec.path.clone(),
            molecule,
            isotopes,
            pf_source: spec.pf.clone(),
            driver: Driver::FixedWidth(reader),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn molecule(&self) -> &str {
        &self.molecule
    }

    pub fn isotopes(&self) -> &[IsotopeInfo] {
        &self.isotopes
    }

    pub fn pf_source(&self) -> &PfSource {
        &self.pf_source
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        match &self.driver {
            Driver::Repack { reader, .. } => reader.len(),
            Driver::FixedWidth(reader) => reader.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sort_key(&self) -> SortKey {
        match &self.driver {
            Driver::Repack { .. } => SortKey::Wavenumber,
            Driver::FixedWidth(reader) => reader.layout().sort_key,
        }
    }

    /// 随机读取第 `index` 条记录的波数 (cm⁻¹)
    pub fn read_wavenumber_at(&mut self, index: usize) -> Result<f64> {
        match &mut self.driver {
            Driver::Repack { reader, .. } => reader.read_wavenumber_at(index),
            Driver::FixedWidth(reader) => reader.read_wavenumber_at(index),
        }
    }

    fn key_at(&mut self, index: usize) -> Result<f64> {
        match &mut self.driver {
            Driver::Repack { reader, .. } => reader.read_wavenumber_at(index),
            Driver::FixedWidth(reader) => reader.read_key_at(index),
        }
    }

    fn ensure_not_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(ExlineError::parse(
                &self.name,
                &self.path,
                "Database contains no records",
            ));
        }
        Ok(())
    }

    /// 数据库的波数覆盖范围 (cm⁻¹)
    pub fn coverage(&mut self) -> Result<(f64, f64)> {
        self.ensure_not_empty()?;
        let first = self.read_wavenumber_at(0)?;
        let last = self.read_wavenumber_at(self.len() - 1)?;
        Ok((first.min(last), first.max(last)))
    }

    /// 定位波数窗口 `[wn_min, wn_max]` 对应的记录区间
    pub fn query_range(&mut self, wn_min: f64, wn_max: f64) -> Result<RangeQuery> {
        if !(wn_min > 0.0 && wn_max >= wn_min) {
            return Err(ExlineError::InvalidRange(format!(
                "Wavenumber window {}--{} cm-1 is not a positive, ordered interval",
                wn_min, wn_max
            )));
        }
        self.ensure_not_empty()?;

        let sort_key = self.sort_key();
        let (key_lo, key_hi) = sort_key.window(wn_min, wn_max);
        let imax = self.len() - 1;
        let key_first = self.key_at(0)?;
        let key_last = self.key_at(imax)?;

        if key_lo > key_last || key_hi < key_first {
            let (db_min, db_max) = self.coverage()?;
            return Ok(RangeQuery::NotCovered(RangeNotCoveredWarning {
                database: self
                    .path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| self.name.clone()),
                db_min,
                db_max,
                req_min: wn_min,
                req_max: wn_max,
            }));
        }

        let start = bounded_search(|i| self.key_at(i), key_lo, 0, imax, SearchDirection::Down)?;
        let stop = bounded_search(|i| self.key_at(i), key_hi, 0, imax, SearchDirection::Up)?;
        Ok(RangeQuery::Covered(LineRange { start, stop }))
    }

    /// 顺序读取区间内的记录，结果按波数升序
    pub fn read_records(
        &mut self,
        range: LineRange,
        observer: &dyn ReadObserver,
    ) -> Result<Vec<LineRecord>> {
        let total = range.len();
        let mut records = Vec::with_capacity(total);
        if total == 0 {
            return Ok(records);
        }
        observer.started(&self.name, range);
        let interval = ((range.stop - range.start) / 10).max(1);
        let notify = |i: usize, rec: &LineRecord| {
            if i != 0 && i % interval == 0 {
                observer.checkpoint(i, total, rec);
            }
        };

        let path = self.path.clone();
        let name = self.name.clone();
        let isotopes = &self.isotopes;
        match &mut self.driver {
            Driver::Repack {
                reader,
                isotope_index,
            } => {
                reader.for_each_in(range.start, range.stop, |i, raw| {
                    let isotope = *isotope_index.get(&raw.isotope).ok_or_else(|| {
                        ExlineError::parse(
                            &name,
                            &path,
                            format!(
                                "Isotope {} of record {} is not listed for this molecule",
                                raw.isotope,
                                range.start + i
                            ),
                        )
                    })?;
                    let rec = LineRecord {
                        wavenumber: raw.wavenumber,
                        elow: raw.elow,
                        gf: raw.gf,
                        isotope,
                    };
                    notify(i, &rec);
                    records.push(rec);
                    Ok(())
                })?;
            }
            Driver::FixedWidth(reader) => {
                let descending = reader.layout().sort_key == SortKey::Wavelength;
                for i in 0..total {
                    let index = if descending {
                        range.stop - i
                    } else {
                        range.start + i
                    };
                    let raw = reader.read_record(index)?;
                    let isotope = match &raw.isotope {
                        Some(label) => isotopes.iter().position(|iso| &iso.name == label).ok_or_else(
                            || {
                                ExlineError::parse(
                                    &name,
                                    &path,
                                    format!(
                                        "Isotope '{}' of record {} is not listed for this molecule",
                                        label, index
                                    ),
                                )
                            },
                        )?,
                        None => 0,
                    };
                    let rec = LineRecord {
                        wavenumber: raw.wavenumber,
                        elow: raw.elow,
                        gf: raw.gf,
                        isotope,
                    };
                    notify(i, &rec);
                    records.push(rec);
                }
            }
        }

        observer.finished(records.len());
        Ok(records)
    }

    /// 查询窗口并读取记录；不重叠时记录警告并返回空列表
    pub fn read_window(
        &mut self,
        wn_min: f64,
        wn_max: f64,
        log: &Log,
        observer: &dyn ReadObserver,
    ) -> Result<Vec<LineRecord>> {
        match self.query_range(wn_min, wn_max)? {
            RangeQuery::Covered(range) => {
                let records = self.read_records(range, observer)?;
                log.msg(
                    &format!("Read {} transitions from {}.", records.len(), self.name),
                    2,
                );
                Ok(records)
            }
            RangeQuery::NotCovered(warning) => {
                log.warning(&warning.to_string());
                Ok(Vec::new())
            }
        }
    }

    /// 构造与 `isotopes()` 顺序一致的配分函数表
    pub fn partition_function(&self) -> Result<PartitionFunctionTable> {
        let names: Vec<String> = self.isotopes.iter().map(|iso| iso.name.clone()).collect();
        match &self.pf_source {
            PfSource::Tabulated(path) => {
                let table = tabulated::read_pf_file(path)?;
                let mut values = Array2::zeros((names.len(), table.temperature.len()));
                for (i, name) in names.iter().enumerate() {
                    let row = table.isotopes.iter().position(|n| n == name).ok_or_else(|| {
                        ExlineError::Configuration(format!(
                            "Isotope '{}' of {} is missing from partition-function file '{}'",
                            name,
                            self.molecule,
                            path.display()
                        ))
                    })?;
                    values.row_mut(i).assign(&table.values.row(row));
                }
                PartitionFunctionTable::new(&self.molecule, names, table.temperature, values)
            }
            PfSource::Builtin => {
                let temps = temperature_grid(builtin::TMIN, builtin::TMAX, builtin::TSTEP);
                let molecule_id = self.isotopes.first().map(|iso| iso.molecule_id).unwrap_or(0);
                let masses: Vec<f64> = self.isotopes.iter().map(|iso| iso.mass).collect();
                let values = builtin::tabulate(molecule_id, &masses, &temps)?;
                PartitionFunctionTable::new(&self.molecule, names, temps, values)
            }
            PfSource::Polynomial => {
                let coeffs = match &self.driver {
                    Driver::FixedWidth(reader) => reader.layout().pf_coefficients.clone(),
                    Driver::Repack { .. } => None,
                }
                .ok_or_else(|| {
                    ExlineError::Configuration(format!(
                        "Database '{}' does not provide partition-function polynomial coefficients",
                        self.name
                    ))
                })?;
                if coeffs.len() != names.len() {
                    return Err(ExlineError::Configuration(format!(
                        "Database '{}' provides {} polynomial sets for {} isotopes",
                        self.name,
                        coeffs.len(),
                        names.len()
                    )));
                }
                let temps = temperature_grid(polynomial::TMIN, polynomial::TMAX, polynomial::TSTEP);
                let values = polynomial::tabulate(&coeffs, &temps);
                PartitionFunctionTable::new(&self.molecule, names, temps, values)
            }
        }
    }
}
