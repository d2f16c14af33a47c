//! # 统一错误处理模块
//!
//! 定义 exline 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 错误分类
//! - I/O：数据库、同位素表、配分函数表、大气文件、输出文件
//! - 解析：定宽记录、表格文件
//! - 配置：构建前即失败（缺少参数、覆盖范围不足、分子无法解析）
//! - 物理范围：配分函数插值越界（不外推）
//! - 表格格式：持久化的不透明度表损坏或版本不符
//!
//! 不重叠的波数窗口不是错误，见 `database::RangeNotCoveredWarning`。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// exline 统一错误类型
#[derive(Error, Debug)]
pub enum ExlineError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    // ─────────────────────────────────────────────────────────────
    // 配置错误（构建前）
    // ─────────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Missing required parameter '{name}': {purpose}")]
    MissingParameter { name: String, purpose: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 物理范围错误
    // ─────────────────────────────────────────────────────────────
    #[error(
        "Temperature {requested:.1} K is outside the partition-function range of {molecule} \
         isotope '{isotope}' ({min:.1}--{max:.1} K)"
    )]
    TemperatureOutOfRange {
        molecule: String,
        isotope: String,
        requested: f64,
        min: f64,
        max: f64,
    },

    // ─────────────────────────────────────────────────────────────
    // 不透明度表格式错误
    // ─────────────────────────────────────────────────────────────
    #[error("Corrupt opacity table {path}: {reason}")]
    CorruptTable { path: String, reason: String },

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 并行构建错误
    // ─────────────────────────────────────────────────────────────
    #[error("Worker {worker} failed: {source}")]
    WorkerFailed {
        worker: usize,
        #[source]
        source: Box<ExlineError>,
    },

    #[error("{0}")]
    Other(String),
}

impl ExlineError {
    /// 构造文件读取错误
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        ExlineError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 构造文件写入错误
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        ExlineError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 构造解析错误
    pub fn parse(format: &str, path: &std::path::Path, reason: impl Into<String>) -> Self {
        ExlineError::ParseError {
            format: format.to_string(),
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, ExlineError>;
