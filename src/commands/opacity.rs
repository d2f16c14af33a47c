//! # opacity 命令实现
//!
//! 验证构建配置、计算截面表并写出。
//!
//! ## 依赖关系
//! - 使用 `cli/opacity.rs` 定义的参数
//! - 使用 `extinction/builder.rs`
//! - 使用 `utils/output.rs`

use super::{database_specs, line_shape, spectral_grid};
use crate::cli::opacity::OpacityArgs;
use crate::constants::BAR;
use crate::error::Result;
use crate::extinction::{OpacityBuilder, OpacityConfig};
use crate::models::atmosphere::read_atmosphere;
use crate::utils::{output, Log};

/// 执行 opacity 命令
pub fn execute(args: OpacityArgs, log: Log) -> Result<()> {
    output::print_header("Building Opacity Table");

    let atmosphere = read_atmosphere(&args.atmosphere)?;
    let config = OpacityConfig {
        output: args.output,
        tmin: args.tmin,
        tmax: args.tmax,
        tstep: args.tstep,
        databases: database_specs(&args.database)?,
        isotopes: args.database.isotopes.clone(),
        spectrum: spectral_grid(&args.spectrum),
        line_shape: line_shape(&args.line_shape),
        ethresh: args.line_shape.ethresh,
        ncpu: args.ncpu,
    };
    output::print_info(&format!(
        "{} database file(s), {} layers ({:.1e}--{:.1e} bar), {} worker(s).",
        config.databases.len(),
        atmosphere.nlayers(),
        atmosphere.pressure.first().copied().unwrap_or(0.0) / BAR,
        atmosphere.pressure.last().copied().unwrap_or(0.0) / BAR,
        if config.ncpu == 0 {
            num_cpus::get()
        } else {
            config.ncpu
        }
    ));

    let table = OpacityBuilder::new(config, atmosphere, log)
        .validate()?
        .build_and_persist()?;

    let (nspec, ntemp, nlayers, nwave) = table.grid.dims();
    output::print_done(&format!(
        "Opacity table [{} species × {} temperatures × {} layers × {} wavenumbers] saved to '{}'",
        nspec,
        ntemp,
        nlayers,
        nwave,
        table.path.display()
    ));
    Ok(())
}
