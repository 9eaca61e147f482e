//! # 解析器模块
//!
//! 各种 MD / 第一性原理输出格式的读写适配器，统一产出 `models::Trajectory`。
//!
//! ## 依赖关系
//! - 被 `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: poscar, xdatcar, outcar, oszicar, lammps_dump, lammps_log, lammps_rdf,
//!   lammps_data, rmc, xyz, voro, tables

pub mod lammps_data;
pub mod lammps_dump;
pub mod lammps_log;
pub mod lammps_rdf;
pub mod oszicar;
pub mod outcar;
pub mod poscar;
pub mod rmc;
pub mod tables;
pub mod voro;
pub mod xdatcar;
pub mod xyz;

use crate::error::{MdlabError, Result};
use crate::models::{Frame, Trajectory};

use clap::ValueEnum;
use std::path::Path;

/// 可读取的结构/轨迹格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum InputFormat {
    /// VASP POSCAR / CONTCAR
    Poscar,
    /// VASP XDATCAR trajectory
    Xdatcar,
    /// LAMMPS text dump
    Dump,
    /// RMC++ v3 configuration
    Rmc,
    /// Extended XYZ
    Xyz,
}

impl std::fmt::Display for InputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputFormat::Poscar => write!(f, "poscar"),
            InputFormat::Xdatcar => write!(f, "xdatcar"),
            InputFormat::Dump => write!(f, "dump"),
            InputFormat::Rmc => write!(f, "rmc"),
            InputFormat::Xyz => write!(f, "xyz"),
        }
    }
}

/// 可写出的格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// VASP POSCAR
    Poscar,
    /// Extended XYZ (multi-frame)
    Xyz,
    /// LAMMPS data file (atom_style atomic)
    Data,
    /// RMC++ v3 configuration
    Rmc,
    /// Voro++ import file
    Voro,
}

impl OutputFormat {
    /// 输出文件名
    pub fn file_name(&self, stem: &str) -> String {
        match self {
            OutputFormat::Poscar => format!("POSCAR_{}", stem),
            OutputFormat::Xyz => format!("{}.xyz", stem),
            OutputFormat::Data => format!("{}.data", stem),
            OutputFormat::Rmc => format!("{}.cfg", stem),
            OutputFormat::Voro => format!("{}.voro", stem),
        }
    }

    /// 是否能在一个文件中保存多帧
    pub fn is_multi_frame(&self) -> bool {
        matches!(self, OutputFormat::Xyz)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Poscar => write!(f, "poscar"),
            OutputFormat::Xyz => write!(f, "xyz"),
            OutputFormat::Data => write!(f, "data"),
            OutputFormat::Rmc => write!(f, "rmc"),
            OutputFormat::Voro => write!(f, "voro"),
        }
    }
}

/// 读取选项
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// 显式指定格式；None 时按文件名推断
    pub format: Option<InputFormat>,
    /// type → 元素名（LAMMPS dump、RMC++ 使用）
    pub elements: Vec<String>,
}

/// 从文件名推断格式
pub fn detect_format(path: &Path) -> Option<InputFormat> {
    let name = path.file_name()?.to_str()?;
    let upper = name.to_uppercase();
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    if upper.starts_with("XDATCAR") {
        return Some(InputFormat::Xdatcar);
    }
    if upper.starts_with("POSCAR") || upper.starts_with("CONTCAR") || ext == "vasp" {
        return Some(InputFormat::Poscar);
    }
    if name.starts_with("dump.") || ext == "dump" || ext == "lammpstrj" {
        return Some(InputFormat::Dump);
    }
    match ext.as_str() {
        "cfg" | "rmc" => Some(InputFormat::Rmc),
        "xyz" | "extxyz" => Some(InputFormat::Xyz),
        _ => None,
    }
}

/// 读取任意支持格式的结构/轨迹
pub fn read_trajectory(path: &Path, options: &ReadOptions) -> Result<Trajectory> {
    if !path.exists() {
        return Err(MdlabError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let format = match options.format.or_else(|| detect_format(path)) {
        Some(f) => f,
        None => {
            return Err(MdlabError::UnsupportedFormat(format!(
                "Cannot determine format for: {} (use --format)",
                path.display()
            )))
        }
    };
    log::debug!("Reading {} as {}", path.display(), format);

    match format {
        InputFormat::Poscar => poscar::parse_poscar_file(path).map(Trajectory::single),
        InputFormat::Xdatcar => xdatcar::parse_xdatcar_file(path),
        InputFormat::Dump => {
            let opts = lammps_dump::DumpOptions {
                elements: options.elements.clone(),
            };
            lammps_dump::parse_dump_file(path, &opts)
        }
        InputFormat::Rmc => rmc::parse_rmc_file(path, &options.elements).map(Trajectory::single),
        InputFormat::Xyz => xyz::parse_xyz_file(path),
    }
}

/// 单帧写出为目标格式
pub fn frame_to_string(frame: &Frame, format: OutputFormat) -> String {
    match format {
        OutputFormat::Poscar => poscar::to_poscar_string(frame),
        OutputFormat::Xyz => xyz::to_xyz_string(frame),
        OutputFormat::Data => lammps_data::to_lammps_data_string(frame),
        OutputFormat::Rmc => rmc::to_rmc_string(frame),
        OutputFormat::Voro => voro::to_voro_string(frame),
    }
}
