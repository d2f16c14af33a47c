//! # 不透明度表构建
//!
//! 构建流程用类型状态表示，每一步只能在上一步成功后进行：
//!
//! ```text
//! OpacityBuilder ──validate──▶ ValidatedBuild ──build──▶ OpacityGrid
//!                                     │                        │
//!                                     │                 build_and_persist
//!                                     │                        ▼
//!                                     │                 PersistedTable
//!                                     └──evaluate_atmosphere / get_ec
//! ```
//!
//! ## 验证阶段
//! 检查必填参数，打开所有数据库，构造配分函数并检查温度覆盖，
//! 读取窗口（含线翼余量）内的谱线并确定宽度网格。
//! 线型缓存在计算开始前按实际条件一次性填充，计算中只读。
//! 所有错误都在分配输出表之前报告。
//!
//! ## 计算阶段
//! 单元编号 `c = itemp · nlayers + ilayer`，第 c 个单元交给第 `c mod ncpu` 个 worker；
//! 每个 worker 只写自己的单元切片，只读共享谱线集合与线型缓存。
//! 只有负责单元 0 的 worker 输出进度日志。
//!
//! ## 依赖关系
//! - 使用 `database/` 读取谱线，`partition/` 计算配分函数
//! - 使用 `broadening/` 建立线型缓存，`extinction/kernel.rs` 计算单元
//! - 使用 `batch/runner.rs` 的工作池并行
//! - 被 `commands/opacity.rs` 和 `commands/extinction.rs` 调用

use super::config::OpacityConfig;
use super::grid::OpacityGrid;
use super::kernel::{accumulate, lorentz_widths, Accumulation, CellConditions, IsotopeEntry, LineSet};
use crate::batch::WorkerPool;
use crate::broadening::widths::{doppler_hwhm, max_widths, min_widths, voigt_hwhm};
use crate::broadening::{LineShapeCache, WidthGrid};
use crate::constants::{BAR, BOLTZMANN};
use crate::database::isotopes::IsotopeTable;
use crate::database::{DatabaseSpec, LineDatabase};
use crate::error::{ExlineError, Result};
use crate::models::{Atmosphere, LineList};
use crate::partition::{temperature_grid, PartitionFunctionTable};
use crate::utils::Log;

use ndarray::Array2;
use std::path::PathBuf;

/// 未验证的构建请求
#[derive(Debug, Clone)]
pub struct OpacityBuilder {
    config: OpacityConfig,
    atmosphere: Atmosphere,
    log: Log,
}

/// 已验证、谱线已读入的构建
#[derive(Debug)]
pub struct ValidatedBuild {
    config: OpacityConfig,
    atmosphere: Atmosphere,
    log: Log,
    output: Option<PathBuf>,
    temperature: Vec<f64>,
    set: LineSet,
    /// 每个数据库的配分函数表
    pf: Vec<PartitionFunctionTable>,
    /// 全局同位素 → (数据库, 数据库内同位素)
    pf_index: Vec<(usize, usize)>,
    cache: LineShapeCache,
}

/// 已写入文件的表
#[derive(Debug)]
pub struct PersistedTable {
    pub path: PathBuf,
    pub grid: OpacityGrid,
}

fn missing(name: &str, purpose: &str) -> ExlineError {
    ExlineError::MissingParameter {
        name: name.to_string(),
        purpose: purpose.to_string(),
    }
}

/// 切片的 (最小值, 最大值)
fn bounds(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
}

impl OpacityBuilder {
    pub fn new(config: OpacityConfig, atmosphere: Atmosphere, log: Log) -> Self {
        Self {
            config,
            atmosphere,
            log,
        }
    }

    /// 表格模式的验证：要求输出文件与温度网格
    pub fn validate(self) -> Result<ValidatedBuild> {
        let output = self
            .config
            .output
            .clone()
            .ok_or_else(|| missing("output", "file name of the opacity table to write"))?;
        let tmin = self
            .config
            .tmin
            .ok_or_else(|| missing("tmin", "lower temperature boundary of the opacity table"))?;
        let tmax = self
            .config
            .tmax
            .ok_or_else(|| missing("tmax", "upper temperature boundary of the opacity table"))?;
        let tstep = self
            .config
            .tstep
            .ok_or_else(|| missing("tstep", "temperature sampling step of the opacity table"))?;
        if !(tmin > 0.0 && tmax >= tmin) {
            return Err(ExlineError::InvalidRange(format!(
                "Temperature range {}--{} K must be positive and increasing",
                tmin, tmax
            )));
        }
        if !(tstep > 0.0) {
            return Err(ExlineError::InvalidArgument(format!(
                "Temperature step must be positive (got {} K)",
                tstep
            )));
        }
        let temperature = temperature_grid(tmin, tmax, tstep);
        self.prepare(Some(output), temperature)
    }

    /// 逐层模式的验证：温度取自大气剖面，不需要输出文件
    pub fn validate_atmosphere(self) -> Result<ValidatedBuild> {
        let temperature = self.atmosphere.temperature.clone();
        self.prepare(None, temperature)
    }

    fn prepare(self, output: Option<PathBuf>, temperature: Vec<f64>) -> Result<ValidatedBuild> {
        let Self {
            config,
            atmosphere,
            log,
        } = self;

        if config.databases.is_empty() {
            return Err(missing("databases", "line-transition databases to process"));
        }
        config.spectrum.validate()?;
        if atmosphere.nlayers() == 0 {
            return Err(ExlineError::Configuration(
                "Atmosphere has no layers".to_string(),
            ));
        }
        let (tmin, tmax) = bounds(temperature.iter().copied());

        log.head("Reading line-transition databases.");
        let isotope_table = config
            .isotopes
            .as_deref()
            .map(IsotopeTable::read)
            .transpose()?;

        let mut databases = Vec::with_capacity(config.databases.len());
        for spec in &config.databases {
            databases.push(open_database(spec, isotope_table.as_ref(), &log)?);
        }

        // 配分函数覆盖必须在分配之前检查
        let mut pf = Vec::with_capacity(databases.len());
        for db in &databases {
            let table = db.partition_function()?;
            table.validate_range(tmin, tmax)?;
            pf.push(table);
        }

        // 光谱覆盖
        let (wn_min, wn_max) = (config.spectrum.wn_min, config.spectrum.wn_max);
        let mut covered = false;
        for db in databases.iter_mut() {
            let (lo, hi) = db.coverage()?;
            covered |= lo <= wn_max && hi >= wn_min;
        }
        if !covered {
            return Err(ExlineError::Configuration(format!(
                "None of the {} database(s) covers the requested range {}--{} cm-1",
                databases.len(),
                wn_min,
                wn_max
            )));
        }

        // 只保留大气中存在的分子，物种按大气中的顺序排列
        let mut atm_indices: Vec<usize> = Vec::new();
        for db in &databases {
            match atmosphere.species_index(db.molecule()) {
                Some(j) => atm_indices.push(j),
                None => log.warning(&format!(
                    "Molecule {} of database '{}' is not present in the atmosphere, \
                     its transitions are skipped.",
                    db.molecule(),
                    db.name()
                )),
            }
        }
        atm_indices.sort_unstable();
        atm_indices.dedup();
        if atm_indices.is_empty() {
            return Err(ExlineError::Configuration(format!(
                "None of the database molecules is present in the atmosphere (species: {})",
                atmosphere.species_names().join(", ")
            )));
        }
        let species: Vec<String> = atm_indices
            .iter()
            .map(|&j| atmosphere.species[j].name.clone())
            .collect();

        let mut isotopes = Vec::new();
        let mut pf_index = Vec::new();
        let mut global: Vec<Vec<Option<usize>>> = Vec::with_capacity(databases.len());
        for (d, db) in databases.iter().enumerate() {
            let atm_index = atmosphere.species_index(db.molecule());
            let mut local = Vec::with_capacity(db.isotopes().len());
            for (l, iso) in db.isotopes().iter().enumerate() {
                let Some(atm_index) = atm_index else {
                    local.push(None);
                    continue;
                };
                local.push(Some(isotopes.len()));
                pf_index.push((d, l));
                isotopes.push(IsotopeEntry {
                    name: iso.name.clone(),
                    molecule: iso.molecule.clone(),
                    mass: iso.mass,
                    ratio: iso.ratio,
                    species: atm_indices.iter().position(|&j| j == atm_index).unwrap_or(0),
                    atm_index,
                });
            }
            global.push(local);
        }

        // 宽度网格
        let (atm_tmin, atm_tmax) = bounds(atmosphere.temperature.iter().copied());
        let (min_temp, max_temp) = (tmin.min(atm_tmin), tmax.max(atm_tmax));
        let (min_mass, max_mass) = bounds(isotopes.iter().map(|iso| iso.mass));
        let (min_radius, max_radius) =
            bounds(isotopes.iter().map(|iso| atmosphere.species[iso.atm_index].radius));
        let (min_pressure, max_pressure) = bounds(atmosphere.pressure.iter().copied());
        let (dmin, lmin) = min_widths(min_temp, max_temp, wn_min, max_mass, min_radius, min_pressure);
        let (dmax, lmax) = max_widths(min_temp, max_temp, wn_max, min_mass, max_radius, max_pressure);
        let grid = WidthGrid::new((dmin, dmax), (lmin, lmax), &config.line_shape)?;
        log.msg(
            &format!(
                "Doppler width range:  {:.3e} -- {:.3e} cm-1 ({} samples).",
                dmin,
                dmax,
                grid.doppler.len()
            ),
            2,
        );
        log.msg(
            &format!(
                "Lorentz width range:  {:.3e} -- {:.3e} cm-1 ({} samples).",
                lmin,
                lmax,
                grid.lorentz.len()
            ),
            2,
        );
        let cache = LineShapeCache::new(grid, config.line_shape.clone(), config.spectrum.fine_step());

        // 读取谱线，窗口两侧留出线翼余量
        let margin = config
            .line_shape
            .cutoff
            .unwrap_or_else(|| config.line_shape.extent * voigt_hwhm(dmax, lmax));
        let read_min = (wn_min - margin).max(f64::EPSILON);
        let read_max = wn_max + margin;
        let mut lines = LineList::default();
        for (d, db) in databases.iter_mut().enumerate() {
            if global[d].iter().all(Option::is_none) {
                continue;
            }
            let records = db.read_window(read_min, read_max, &log, &log)?;
            for rec in &records {
                if let Some(g) = global[d][rec.isotope] {
                    lines.push(rec, g);
                }
            }
        }
        log.msg(
            &format!(
                "Loaded {} line transitions of {} species ({}).",
                lines.len(),
                species.len(),
                species.join(", ")
            ),
            2,
        );

        Ok(ValidatedBuild {
            config,
            atmosphere,
            log,
            output,
            temperature,
            set: LineSet {
                lines,
                isotopes,
                species,
            },
            pf,
            pf_index,
            cache,
        })
    }
}

fn open_database(spec: &DatabaseSpec, table: Option<&IsotopeTable>, log: &Log) -> Result<LineDatabase> {
    let db = LineDatabase::open(spec, table)?;
    log.msg(
        &format!(
            "Database '{}': {} records, {} isotope(s).",
            db.name(),
            db.len(),
            db.isotopes().len()
        ),
        2,
    );
    Ok(db)
}

impl ValidatedBuild {
    /// 输出物种名（按大气顺序）
    #[cfg(test)]
    pub fn species(&self) -> &[String] {
        &self.set.species
    }

    /// 表格温度网格（逐层模式下为大气温度）
    #[cfg(test)]
    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    #[cfg(test)]
    pub fn lines(&self) -> &LineSet {
        &self.set
    }

    #[cfg(test)]
    pub fn cache(&self) -> &LineShapeCache {
        &self.cache
    }

    pub fn atmosphere(&self) -> &Atmosphere {
        &self.atmosphere
    }

    #[cfg(test)]
    pub fn output(&self) -> Option<&PathBuf> {
        self.output.as_ref()
    }

    /// 各同位素在给定温度下的配分函数 [isotope, temperature]
    fn pf_matrix(&self, temperature: &[f64]) -> Result<Array2<f64>> {
        let mut z = Array2::zeros((self.pf_index.len(), temperature.len()));
        for (g, &(d, l)) in self.pf_index.iter().enumerate() {
            for (t, &temp) in temperature.iter().enumerate() {
                z[[g, t]] = self.pf[d].interpolate(l, temp)?;
            }
        }
        Ok(z)
    }

    /// 第 `ilayer` 层的混合比在温度 `temperature` 下对应的数密度
    fn densities_at(&self, ilayer: usize, temperature: f64) -> Vec<f64> {
        let total = self.atmosphere.pressure[ilayer] / (BOLTZMANN * temperature);
        self.atmosphere
            .vmr
            .row(ilayer)
            .iter()
            .map(|&q| q * total)
            .collect()
    }

    /// 为给定条件预先计算所有可能用到的线型
    fn prepare_cache(&mut self, conditions: &[(f64, Vec<f64>)]) {
        let span = self.set.wavenumber_span();
        let before = self.cache.len();
        for (temperature, density) in conditions {
            let cell = CellConditions {
                temperature: *temperature,
                density,
                pf: &[],
            };
            let lorentz = lorentz_widths(&self.set, &self.atmosphere.species, &cell);
            for (g, iso) in self.set.isotopes.iter().enumerate() {
                let Some((lo, hi)) = span[g] else {
                    continue;
                };
                let ilo = self
                    .cache
                    .grid()
                    .doppler_bin(doppler_hwhm(lo, *temperature, iso.mass));
                let ihi = self
                    .cache
                    .grid()
                    .doppler_bin(doppler_hwhm(hi, *temperature, iso.mass));
                for idop in ilo..=ihi {
                    let doppler = self.cache.grid().doppler[idop];
                    self.cache.lookup(doppler, lorentz[g]);
                }
            }
        }
        self.log.msg(
            &format!(
                "Computed {} new line profiles ({} cached).",
                self.cache.len() - before,
                self.cache.len()
            ),
            2,
        );
    }

    /// 计算完整的截面表 `[species, temperature, layer, wavenumber]`
    pub fn build(mut self) -> Result<OpacityGrid> {
        let nlayers = self.atmosphere.nlayers();
        let ntemp = self.temperature.len();
        self.log.head(&format!(
            "Generating new cross-section table for {} species ({} temperatures, {} layers).",
            self.set.species.len(),
            ntemp,
            nlayers
        ));
        self.log.msg(
            &format!(
                "Temperature sample (K): {}",
                self.temperature
                    .iter()
                    .map(|t| format!("{:.1}", t))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            2,
        );

        let z = self.pf_matrix(&self.temperature)?;
        let conditions: Vec<(f64, Vec<f64>)> = self
            .temperature
            .iter()
            .flat_map(|&t| (0..nlayers).map(move |ilayer| (t, ilayer)))
            .map(|(t, ilayer)| (t, self.densities_at(ilayer, t)))
            .collect();
        self.prepare_cache(&conditions);

        let mut grid = OpacityGrid::zeros(
            self.set.species.clone(),
            self.temperature.clone(),
            self.atmosphere.pressure.clone(),
            self.config.spectrum.wavenumbers(),
        );
        let ncells = grid.ncells();
        let pool = WorkerPool::new(self.config.ncpu).with_progress(self.log.verbosity() >= 1);
        let groups = pool.distribute(grid.cells_mut()?);

        let this = &self;
        let z = &z;
        pool.run(groups, ncells as u64, |_, cells, pb| {
            let log = if cells.first().map(|(c, _)| *c) == Some(0) {
                this.log.clone()
            } else {
                this.log.muted()
            };
            for (c, out) in cells {
                let (itemp, ilayer) = (c / nlayers, c % nlayers);
                let temperature = this.temperature[itemp];
                log.msg(
                    &format!(
                        "Extinction-coefficient table: layer {:3}/{}, temperature {:3}/{} ({:.1} K).",
                        ilayer + 1,
                        nlayers,
                        itemp + 1,
                        ntemp,
                        temperature
                    ),
                    2,
                );
                // 数密度取层的压力与混合比，按单元温度重算，不用大气剖面的层温度
                let density = this.densities_at(ilayer, temperature);
                let pf: Vec<f64> = z.column(itemp).to_vec();
                let cell = CellConditions {
                    temperature,
                    density: &density,
                    pf: &pf,
                };
                accumulate(
                    &this.set,
                    &this.atmosphere.species,
                    &this.cache,
                    &this.config.spectrum,
                    this.config.ethresh,
                    &cell,
                    Accumulation::PerSpecies,
                    out,
                )?;
                pb.inc(1);
            }
            Ok(())
        })?;

        self.log.success("Cross-section table computed.");
        Ok(grid)
    }

    /// 计算并写出截面表
    pub fn build_and_persist(self) -> Result<PersistedTable> {
        let path = self
            .output
            .clone()
            .ok_or_else(|| missing("output", "file name of the opacity table to write"))?;
        let log = self.log.clone();
        let grid = self.build()?;
        grid.write(&path)?;
        log.head(&format!(
            "Cross-section table written to file: '{}'.",
            path.display()
        ));
        Ok(PersistedTable { path, grid })
    }

    /// 按大气剖面逐层计算总消光 [layer, wavenumber] (cm⁻¹)
    pub fn evaluate_atmosphere(&mut self) -> Result<Array2<f64>> {
        let nlayers = self.atmosphere.nlayers();
        let nwave = self.config.spectrum.nwave();
        self.validate_layer_temperatures()?;
        self.log.head(&format!(
            "Calculating extinction over {} atmospheric layers.",
            nlayers
        ));

        let layer_temps = self.atmosphere.temperature.clone();
        let z = self.pf_matrix(&layer_temps)?;
        let conditions: Vec<(f64, Vec<f64>)> = (0..nlayers)
            .map(|ilayer| (layer_temps[ilayer], self.atmosphere.density.row(ilayer).to_vec()))
            .collect();
        self.prepare_cache(&conditions);

        let mut extinction = Array2::zeros((nlayers, nwave));
        let rows: Vec<&mut [f64]> = match extinction.as_slice_mut() {
            Some(data) if nwave > 0 => data.chunks_mut(nwave).collect(),
            _ => {
                return Err(ExlineError::Other(
                    "Extinction buffer is empty or not contiguous".to_string(),
                ))
            }
        };
        let pool = WorkerPool::new(self.config.ncpu).with_progress(self.log.verbosity() >= 1);
        let groups = pool.distribute(rows);

        let this = &*self;
        let z = &z;
        pool.run(groups, nlayers as u64, |_, layers, pb| {
            let log = if layers.first().map(|(i, _)| *i) == Some(0) {
                this.log.clone()
            } else {
                this.log.muted()
            };
            for (ilayer, out) in layers {
                let temperature = this.atmosphere.temperature[ilayer];
                log.msg(
                    &format!(
                        "Calculating extinction at layer {:3}/{} (T={:6.1} K, p={:.1e} bar).",
                        ilayer + 1,
                        nlayers,
                        temperature,
                        this.atmosphere.pressure[ilayer] / BAR
                    ),
                    2,
                );
                let density = this.atmosphere.density.row(ilayer).to_vec();
                let pf: Vec<f64> = z.column(ilayer).to_vec();
                let cell = CellConditions {
                    temperature,
                    density: &density,
                    pf: &pf,
                };
                accumulate(
                    &this.set,
                    &this.atmosphere.species,
                    &this.cache,
                    &this.config.spectrum,
                    this.config.ethresh,
                    &cell,
                    Accumulation::Total,
                    out,
                )?;
                pb.inc(1);
            }
            Ok(())
        })?;

        Ok(extinction)
    }

    /// 单层各物种的消光 [species, wavenumber] (cm⁻¹) 及物种名
    pub fn get_ec(&mut self, layer: usize) -> Result<(Array2<f64>, Vec<String>)> {
        let nlayers = self.atmosphere.nlayers();
        if layer >= nlayers {
            return Err(ExlineError::InvalidArgument(format!(
                "Layer {} is outside the atmosphere (0--{})",
                layer,
                nlayers.saturating_sub(1)
            )));
        }
        let temperature = self.atmosphere.temperature[layer];
        for table in &self.pf {
            table.validate_range(temperature, temperature)?;
        }
        let density = self.atmosphere.density.row(layer).to_vec();
        let z = self.pf_matrix(&[temperature])?;
        self.prepare_cache(&[(temperature, density.clone())]);

        let nspec = self.set.species.len();
        let nwave = self.config.spectrum.nwave();
        let mut out = vec![0.0; nspec * nwave];
        let pf = z.column(0).to_vec();
        let cell = CellConditions {
            temperature,
            density: &density,
            pf: &pf,
        };
        accumulate(
            &self.set,
            &self.atmosphere.species,
            &self.cache,
            &self.config.spectrum,
            self.config.ethresh,
            &cell,
            Accumulation::PerSpecies,
            &mut out,
        )?;

        let mut ec = Array2::from_shape_vec((nspec, nwave), out)
            .map_err(|e| ExlineError::Other(format!("Extinction buffer shape: {}", e)))?;
        for (s, mut row) in ec.rows_mut().into_iter().enumerate() {
            let atm_index = self
                .set
                .isotopes
                .iter()
                .find(|iso| iso.species == s)
                .map(|iso| iso.atm_index);
            if let Some(j) = atm_index {
                let n = density[j];
                row.mapv_inplace(|k| k * n);
            }
        }
        Ok((ec, self.set.species.clone()))
    }

    fn validate_layer_temperatures(&self) -> Result<()> {
        let (tmin, tmax) = bounds(self.atmosphere.temperature.iter().copied());
        for table in &self.pf {
            table.validate_range(tmin, tmax)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadening::LineShapeConfig;
    use crate::database::repack::{write_repack, RepackRecord};
    use crate::database::tests::ISOTOPES;
    use crate::database::DatabaseFormat;
    use crate::extinction::config::SpectralGrid;
    use crate::models::atmosphere::species_from_name;
    use crate::partition::PfSource;
    use approx::assert_relative_eq;
    use ndarray::array;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    /// CO 重组数据库：30 条谱线覆盖 2001--2097 cm⁻¹
    fn co_database(dir: &TempDir) -> DatabaseSpec {
        let path = dir.path().join("CO_hitran_test.bin");
        let records: Vec<RepackRecord> = (0..30)
            .map(|i| RepackRecord {
                wavenumber: 2001.0 + 3.3 * i as f64,
                elow: 100.0 * i as f64,
                gf: 1e-3 * (1.0 + (i % 5) as f64),
                isotope: if i % 3 == 0 { 36 } else { 26 },
            })
            .collect();
        write_repack(&path, &records).unwrap();
        DatabaseSpec::new(path, DatabaseFormat::Repack, PfSource::Builtin)
    }

    fn h2o_database(dir: &TempDir) -> DatabaseSpec {
        let path = dir.path().join("H2O_hitran_test.bin");
        let records: Vec<RepackRecord> = (0..5)
            .map(|i| RepackRecord {
                wavenumber: 2010.0 + 10.0 * i as f64,
                elow: 50.0,
                gf: 1e-2,
                isotope: 161,
            })
            .collect();
        write_repack(&path, &records).unwrap();
        DatabaseSpec::new(path, DatabaseFormat::Repack, PfSource::Builtin)
    }

    /// 三层大气 (1e-4, 1e-2, 10 bar)，可选择是否含 CO
    fn atmosphere(with_co: bool) -> Atmosphere {
        let mut names = vec!["H2", "He"];
        if with_co {
            names.push("CO");
        }
        let species = names.iter().map(|n| species_from_name(n).unwrap()).collect();
        let vmr = if with_co {
            array![[0.85, 0.149, 1e-3], [0.85, 0.149, 1e-3], [0.85, 0.149, 1e-3]]
        } else {
            array![[0.85, 0.15], [0.85, 0.15], [0.85, 0.15]]
        };
        Atmosphere::new(
            species,
            vec![1e-4 * BAR, 1e-2 * BAR, 10.0 * BAR],
            vec![800.0, 1000.0, 1200.0],
            vmr,
        )
        .unwrap()
    }

    fn config(dir: &TempDir, databases: Vec<DatabaseSpec>, ncpu: usize) -> OpacityConfig {
        let isotopes = dir.path().join("isotopes.dat");
        fs::write(&isotopes, ISOTOPES).unwrap();
        OpacityConfig {
            output: Some(dir.path().join("out").join("opacity.bin")),
            tmin: Some(500.0),
            tmax: Some(1500.0),
            tstep: Some(500.0),
            databases,
            isotopes: Some(isotopes),
            spectrum: SpectralGrid::new(2000.0, 2100.0, 0.5, 4),
            line_shape: LineShapeConfig::default(),
            ethresh: 1e-15,
            ncpu,
        }
    }

    fn validated(dir: &TempDir, ncpu: usize) -> ValidatedBuild {
        let cfg = config(dir, vec![co_database(dir)], ncpu);
        OpacityBuilder::new(cfg, atmosphere(true), Log::silent())
            .validate()
            .unwrap()
    }

    #[test]
    fn test_missing_parameters_are_reported() {
        let dir = tempdir().unwrap();
        let base = config(&dir, vec![co_database(&dir)], 1);

        let cfg = OpacityConfig {
            output: None,
            ..base.clone()
        };
        match OpacityBuilder::new(cfg, atmosphere(true), Log::silent()).validate() {
            Err(ExlineError::MissingParameter { name, .. }) => assert_eq!(name, "output"),
            other => panic!("expected MissingParameter, got {:?}", other),
        }

        let cfg = OpacityConfig {
            tstep: None,
            ..base.clone()
        };
        match OpacityBuilder::new(cfg, atmosphere(true), Log::silent()).validate() {
            Err(ExlineError::MissingParameter { name, .. }) => assert_eq!(name, "tstep"),
            other => panic!("expected MissingParameter, got {:?}", other),
        }

        let cfg = OpacityConfig {
            databases: Vec::new(),
            ..base
        };
        match OpacityBuilder::new(cfg, atmosphere(true), Log::silent()).validate() {
            Err(ExlineError::MissingParameter { name, .. }) => assert_eq!(name, "databases"),
            other => panic!("expected MissingParameter, got {:?}", other),
        }
    }

    #[test]
    fn test_temperature_outside_partition_function_fails_validation() {
        let dir = tempdir().unwrap();
        let cfg = OpacityConfig {
            tmin: Some(50.0),
            ..config(&dir, vec![co_database(&dir)], 1)
        };
        match OpacityBuilder::new(cfg, atmosphere(true), Log::silent()).validate() {
            Err(ExlineError::TemperatureOutOfRange {
                molecule,
                requested,
                min,
                ..
            }) => {
                assert_eq!(molecule, "CO");
                assert_eq!(requested, 50.0);
                assert_eq!(min, 70.0);
            }
            other => panic!("expected TemperatureOutOfRange, got {:?}", other),
        }
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_uncovered_window_is_configuration_error() {
        let dir = tempdir().unwrap();
        let cfg = OpacityConfig {
            spectrum: SpectralGrid::new(5000.0, 5100.0, 1.0, 2),
            ..config(&dir, vec![co_database(&dir)], 1)
        };
        let err = OpacityBuilder::new(cfg, atmosphere(true), Log::silent())
            .validate()
            .unwrap_err();
        assert!(matches!(err, ExlineError::Configuration(_)));
    }

    #[test]
    fn test_molecules_absent_from_atmosphere() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, vec![co_database(&dir)], 1);
        let err = OpacityBuilder::new(cfg, atmosphere(false), Log::silent())
            .validate()
            .unwrap_err();
        assert!(matches!(err, ExlineError::Configuration(_)));

        // H2O 不在大气中，跳过并警告；CO 保留
        let cfg = config(&dir, vec![h2o_database(&dir), co_database(&dir)], 1);
        let (log, buffer) = Log::memory(1);
        let build = OpacityBuilder::new(cfg, atmosphere(true), log)
            .validate()
            .unwrap();
        assert_eq!(build.species(), ["CO".to_string()]);
        assert_eq!(build.lines().lines.len(), 30);
        assert!(build
            .lines()
            .isotopes
            .iter()
            .all(|iso| iso.molecule == "CO" && iso.atm_index == 2));
        let lines = buffer.lock().unwrap();
        assert!(lines
            .iter()
            .any(|l| l.starts_with("[WARN]") && l.contains("H2O")));
    }

    #[test]
    fn test_validation_reads_window_and_fills_cache() {
        let dir = tempdir().unwrap();
        let build = validated(&dir, 1);
        assert_eq!(build.temperature(), [500.0, 1000.0, 1500.0]);
        assert_eq!(build.lines().isotopes.len(), 2);
        assert_eq!(build.lines().lines.len(), 30);
        assert!(build.cache().is_empty());
        assert_eq!(build.output(), Some(&dir.path().join("out").join("opacity.bin")));
    }

    #[test]
    fn test_build_is_independent_of_worker_count() {
        let dir = tempdir().unwrap();
        let serial = validated(&dir, 1).build().unwrap();
        let parallel = validated(&dir, 4).build().unwrap();

        assert_eq!(serial.dims(), (1, 3, 3, 201));
        assert_eq!(serial, parallel);
        let coefficients = serial.coefficients();
        assert!(coefficients.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(coefficients.iter().any(|v| *v > 0.0));
    }

    #[test]
    fn test_build_and_persist_round_trip() {
        let dir = tempdir().unwrap();
        let table = validated(&dir, 2).build_and_persist().unwrap();
        assert!(table.path.exists());
        let back = OpacityGrid::read(&table.path).unwrap();
        assert_eq!(back, table.grid);
        assert_eq!(back.species(), ["CO".to_string()]);
        assert_eq!(back.pressure()[2], 10.0 * BAR);
    }

    #[test]
    fn test_only_first_worker_logs_cells() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, vec![co_database(&dir)], 2);
        let (log, buffer) = Log::memory(2);
        OpacityBuilder::new(cfg, atmosphere(true), log)
            .validate()
            .unwrap()
            .build()
            .unwrap();
        let lines = buffer.lock().unwrap();
        let cell_messages = lines
            .iter()
            .filter(|l| l.contains("Extinction-coefficient table"))
            .count();
        // 9 个单元，worker 0 负责 0, 2, 4, 6, 8
        assert_eq!(cell_messages, 5);
    }

    #[test]
    fn test_get_ec_matches_table_cell() {
        let dir = tempdir().unwrap();
        let grid = validated(&dir, 1).build().unwrap();

        let cfg = config(&dir, vec![co_database(&dir)], 1);
        let mut build = OpacityBuilder::new(cfg, atmosphere(true), Log::silent())
            .validate_atmosphere()
            .unwrap();
        // 第 1 层温度 1000 K 与表格第 1 个温度相同；该层谱线未分辨，与宽度网格无关
        let (ec, labels) = build.get_ec(1).unwrap();
        assert_eq!(labels, vec!["CO".to_string()]);
        assert_eq!(ec.dim(), (1, 201));

        let density = build.atmosphere().density[[1, 2]];
        let cell = grid.cell(1, 1);
        for (a, b) in ec.row(0).iter().zip(cell.row(0)) {
            assert_relative_eq!(*a, b * density, max_relative = 1e-9, epsilon = 1e-300);
        }
        assert!(build.get_ec(3).is_err());
    }

    #[test]
    fn test_get_ec_fills_cache_once_per_layer() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, vec![co_database(&dir)], 1);
        let mut build = OpacityBuilder::new(cfg, atmosphere(true), Log::silent())
            .validate_atmosphere()
            .unwrap();
        assert!(build.cache().is_empty());

        let (first, _) = build.get_ec(2).unwrap();
        let cached = build.cache().len();
        assert!(cached > 0);
        let (second, _) = build.get_ec(2).unwrap();
        assert_eq!(build.cache().len(), cached);
        assert_eq!(first, second);
    }

    #[test]
    fn test_evaluate_atmosphere_sums_species() {
        let dir = tempdir().unwrap();
        let cfg = config(&dir, vec![co_database(&dir)], 3);
        let mut build = OpacityBuilder::new(cfg, atmosphere(true), Log::silent())
            .validate_atmosphere()
            .unwrap();
        let extinction = build.evaluate_atmosphere().unwrap();
        assert_eq!(extinction.dim(), (3, 201));
        for layer in 0..3 {
            let (ec, _) = build.get_ec(layer).unwrap();
            for (a, b) in extinction.row(layer).iter().zip(ec.row(0)) {
                assert_relative_eq!(*a, *b, max_relative = 1e-9, epsilon = 1e-300);
            }
        }
        let area: Vec<f64> = extinction.rows().into_iter().map(|r| r.sum()).collect();
        assert!(area.iter().all(|a| *a > 0.0));
    }
}
