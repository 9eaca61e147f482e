//! # info 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/info.rs`

use crate::parsers::InputFormat;

use clap::Args;
use std::path::PathBuf;

/// info 子命令参数
#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Structure format (detected from each file name by default)
    #[arg(short, long, value_enum)]
    pub format: Option<InputFormat>,

    /// Element names for numeric atom types, type 1 first
    #[arg(short, long, value_delimiter = ',')]
    pub elements: Vec<String>,

    /// Glob pattern(s) for input files in directory mode, comma separated
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Print a JSON document instead of a table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
