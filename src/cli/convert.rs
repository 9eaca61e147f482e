//! # convert 子命令 CLI 定义
//!
//! 批量转换结构/轨迹文件格式（POSCAR, XDATCAR, LAMMPS dump, RMC++, XYZ
//! -> POSCAR, XYZ, LAMMPS data, RMC++, Voro++ 输入）
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/convert.rs`

use crate::parsers::{InputFormat, OutputFormat};

use clap::Args;
use std::path::PathBuf;

/// convert 子命令参数
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Input file or directory
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory for converted files
    #[arg(short, long)]
    pub output: PathBuf,

    /// Target output format
    #[arg(short, long, value_enum)]
    pub target: OutputFormat,

    /// Input format (detected from each file name by default)
    #[arg(short, long, value_enum)]
    pub format: Option<InputFormat>,

    /// Element names for numeric atom types, type 1 first (e.g. "Al,Sm")
    #[arg(short, long, value_delimiter = ',')]
    pub elements: Vec<String>,

    /// Frames to convert as start:stop:stride (default: all frames)
    #[arg(long)]
    pub frames: Option<String>,

    /// Convert only the frame with this MD timestep
    #[arg(long, conflicts_with = "frames")]
    pub timestep: Option<u64>,

    /// Wrap atoms back into the periodic cell before writing
    #[arg(long, default_value_t = false)]
    pub wrap: bool,

    /// Recurse into subdirectories
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Glob pattern(s) for input files in directory mode, comma separated
    #[arg(short, long, default_value = "*")]
    pub pattern: String,

    /// Overwrite existing output files
    #[arg(long, default_value_t = false)]
    pub overwrite: bool,
}
