//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `info`: 结构/轨迹/输出文件概要
//! - `convert`: 结构格式转换
//! - `analyze`: 分析功能（嵌套子命令）
//!   - `rdf`, `sq`, `bad`, `ha`, `voronoi`, `voro-stats`, `wc`, `eos`
//!
//! 全局选项：`-v`（可重复）、`--config`、`--jobs`
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: info, convert, analyze

pub mod analyze;
pub mod convert;
pub mod info;

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// mdlab - 分子动力学 / 第一性原理模拟结果分析工具
#[derive(Parser, Debug)]
#[command(name = "mdlab")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(
    about = "Parse MD / ab-initio outputs and compute structural and energetic properties",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// TOML config file with default analysis parameters
    #[arg(long, global = true, env = "MDLAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Number of worker threads (0 = all cores)
    #[arg(short, long, global = true, default_value_t = 0)]
    pub jobs: usize,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize structure, trajectory, OUTCAR, OSZICAR and LAMMPS log files
    Info(info::InfoArgs),

    /// Convert structures and trajectories between formats
    Convert(convert::ConvertArgs),

    /// Run structural and energetic analyses
    Analyze(analyze::AnalyzeArgs),
}
