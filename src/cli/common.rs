//! # 公共 CLI 参数组
//!
//! 多个子命令共享的参数，通过 `#[command(flatten)]` 引入。
//!
//! ## 依赖关系
//! - 被 `cli/` 各子命令使用
//! - 由 `commands/mod.rs` 转换为构建配置

use clap::Args;
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 谱线数据库
// ─────────────────────────────────────────────────────────────

/// 数据库输入
#[derive(Args, Debug, Clone)]
pub struct DatabaseArgs {
    /// Line-database files or directories containing them
    #[arg(long = "db", required = true, num_args = 1..)]
    pub databases: Vec<PathBuf>,

    /// Database format: repack, plez-vo
    #[arg(long, default_value = "repack")]
    pub format: String,

    /// Partition function: 'builtin', 'poly', or a tabulated PF file
    #[arg(long, default_value = "builtin")]
    pub pf: String,

    /// Molecule name, overriding what the file name or records say
    #[arg(long)]
    pub molecule: Option<String>,

    /// Isotope metadata table (molID molName hitranIso exomolIso ratio mass)
    #[arg(long, env = "EXLINE_ISOTOPES")]
    pub isotopes: Option<PathBuf>,

    /// File patterns used inside directories (comma separated, e.g. '*.bin')
    #[arg(long)]
    pub pattern: Option<String>,

    /// Search directories recursively
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,
}

// ─────────────────────────────────────────────────────────────
// 光谱网格与线型
// ─────────────────────────────────────────────────────────────

/// 输出波数网格
#[derive(Args, Debug, Clone)]
pub struct SpectrumArgs {
    /// Lower wavenumber boundary (cm-1)
    #[arg(long, default_value_t = 2000.0)]
    pub wn_min: f64,

    /// Upper wavenumber boundary (cm-1)
    #[arg(long, default_value_t = 20000.0)]
    pub wn_max: f64,

    /// Wavenumber sampling step (cm-1)
    #[arg(long, default_value_t = 1.0)]
    pub wn_step: f64,

    /// Oversampling factor of the line-profile sampling
    #[arg(long, default_value_t = 10)]
    pub oversampling: usize,
}

/// 线型与强度过滤参数
#[derive(Args, Debug, Clone)]
pub struct LineShapeArgs {
    /// Line-wing cutoff from the line center (cm-1)
    #[arg(long, default_value_t = 25.0)]
    pub cutoff: f64,

    /// Disable the fixed cutoff; profiles extend over `extent` Voigt widths
    #[arg(long, default_value_t = false)]
    pub no_cutoff: bool,

    /// Profile extent in Voigt half widths (when no cutoff applies)
    #[arg(long, default_value_t = 20.0)]
    pub extent: f64,

    /// Number of Doppler-width samples of the profile cache
    #[arg(long, default_value_t = 40)]
    pub ndop: usize,

    /// Number of Lorentz-width samples of the profile cache
    #[arg(long, default_value_t = 40)]
    pub nlor: usize,

    /// Lorentz/Doppler ratio below which the narrowest Lorentz width is used
    #[arg(long, default_value_t = 0.1)]
    pub dlratio: f64,

    /// Skip lines weaker than this fraction of the strongest line of the species
    #[arg(long, default_value_t = 1e-15)]
    pub ethresh: f64,
}
