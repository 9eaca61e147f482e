//! # 统一错误处理模块
//!
//! 定义 mdlab 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// mdlab 统一错误类型
#[derive(Error, Debug)]
pub enum MdlabError {
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

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

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

    #[error("Unknown atom type {atom_type}: only {known} element name(s) given (use --elements)")]
    UnknownAtomType { atom_type: usize, known: usize },

    // ─────────────────────────────────────────────────────────────
    // 轨迹与帧选择错误
    // ─────────────────────────────────────────────────────────────
    #[error("Requested timestep {0} does not exist in trajectory")]
    TimestepNotFound(u64),

    #[error("Frame selection is empty (trajectory has {frames} frame(s))")]
    EmptySelection { frames: usize },

    #[error("Inconsistent atom count: frame {frame} has {found} atoms, expected {expected}")]
    InconsistentAtomCount {
        frame: usize,
        expected: usize,
        found: usize,
    },

    // ─────────────────────────────────────────────────────────────
    // 分析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Lattice matrix is singular (volume = {0:.3e})")]
    SingularLattice(f64),

    #[error("No scattering data for element '{0}'")]
    UnknownElement(String),

    #[error("Fit failed: {0}")]
    FitError(String),

    #[error("Analysis error: {0}")]
    AnalysisError(String),

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range format: {0}")]
    InvalidRange(String),

    // ─────────────────────────────────────────────────────────────
    // 配置 / CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid config file: {path}")]
    ConfigError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("No matching files found with pattern: {pattern}")]
    NoFilesFound { pattern: String },

    #[error("{0}")]
    Other(String),
}

impl MdlabError {
    /// 构造解析错误的简写
    pub fn parse(format: &str, path: &str, reason: impl Into<String>) -> Self {
        MdlabError::ParseError {
            format: format.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, MdlabError>;
