//! # analyze 子命令 CLI 定义
//!
//! 分析功能统一入口，包含多个子命令：
//! - `rdf`: 径向分布函数与配位数
//! - `sq`: 静态结构因子
//! - `bad`: 键角分布
//! - `ha`: Honeycutt-Andersen 键对分析
//! - `voronoi`: Voronoi 多面体
//! - `voro-stats`: Voro++ 输出的指数统计
//! - `wc`: Warren-Cowley 化学短程序
//! - `eos`: Birch-Murnaghan 状态方程拟合
//!
//! 未在命令行给出的参数回退到配置文件，再回退到内置默认值。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/analyze/` 相应模块

use crate::analysis::structure_factor::{Radiation, SqMethod};
use crate::parsers::InputFormat;

use clap::{Args, Subcommand};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// Analyze 主命令
// ─────────────────────────────────────────────────────────────

/// analyze 主命令参数
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(subcommand)]
    pub command: AnalyzeCommands,
}

/// analyze 子命令
#[derive(Subcommand, Debug)]
pub enum AnalyzeCommands {
    /// Radial distribution function g(r), partials and coordination numbers
    Rdf(RdfArgs),

    /// Static structure factor S(q) from a trajectory or an RDF table
    Sq(SqArgs),

    /// Bond angle distribution
    Bad(BondAngleArgs),

    /// Honeycutt-Andersen pair analysis
    Ha(HaArgs),

    /// Voronoi tessellation: cell volumes and Voronoi indices
    Voronoi(VoronoiArgs),

    /// Voronoi index statistics from a Voro++ output file (%i %q %v %A)
    VoroStats(VoroStatsArgs),

    /// Warren-Cowley chemical short-range order
    Wc(WarrenCowleyArgs),

    /// Birch-Murnaghan equation of state fit
    Eos(EosArgs),
}

// ─────────────────────────────────────────────────────────────
// 公共参数
// ─────────────────────────────────────────────────────────────

/// 键长截断：数值或 "auto"（取 g(r) 第一极小）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CutoffArg {
    Auto,
    Value(f64),
}

/// 解析截断参数
pub fn parse_cutoff(input: &str) -> Result<CutoffArg, String> {
    if input.eq_ignore_ascii_case("auto") {
        return Ok(CutoffArg::Auto);
    }
    match input.parse::<f64>() {
        Ok(v) if v > 0.0 => Ok(CutoffArg::Value(v)),
        Ok(v) => Err(format!("cutoff must be positive, got {}", v)),
        Err(_) => Err(format!("expected a number or 'auto', got '{}'", input)),
    }
}

/// 输入轨迹参数
#[derive(Args, Debug, Clone)]
pub struct TrajectoryArgs {
    /// Input structure or trajectory (POSCAR, XDATCAR, LAMMPS dump, RMC++ cfg, XYZ)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Input format (detected from the file name by default)
    #[arg(short, long, value_enum)]
    pub format: Option<InputFormat>,

    /// Element names for numeric atom types, type 1 first (e.g. "Al,Sm")
    #[arg(short, long, value_delimiter = ',')]
    pub elements: Vec<String>,

    /// Frames to analyze as start:stop:stride (e.g. "100:", "::10", "5")
    #[arg(long)]
    pub frames: Option<String>,

    /// Analyze only the last frame
    #[arg(long, default_value_t = false, conflicts_with = "frames")]
    pub last: bool,
}

/// 输出参数
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Output directory (default: current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Prefix for output file names (default: input file name)
    #[arg(long)]
    pub prefix: Option<String>,

    /// Write plots as SVG instead of PNG
    #[arg(long, default_value_t = false)]
    pub svg: bool,

    /// Skip plot generation
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,
}

// ─────────────────────────────────────────────────────────────
// RDF / S(q)
// ─────────────────────────────────────────────────────────────

/// rdf 子命令参数
#[derive(Args, Debug)]
pub struct RdfArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Maximum distance in Å [default: 8.0]
    #[arg(short, long)]
    pub cutoff: Option<f64>,

    /// Number of histogram bins [default: 100]
    #[arg(short, long)]
    pub bins: Option<usize>,

    /// Disable Savitzky-Golay smoothing of g(r)
    #[arg(long, default_value_t = false)]
    pub no_smooth: bool,

    /// Smoothing window length (odd) [default: 7]
    #[arg(long)]
    pub smooth_window: Option<usize>,

    /// Smoothing polynomial order [default: 3]
    #[arg(long)]
    pub smooth_order: Option<usize>,
}

/// sq 子命令参数
#[derive(Args, Debug)]
pub struct SqArgs {
    /// Input structure or trajectory; g(r) is computed first
    #[arg(short, long, required_unless_present = "rdf", conflicts_with = "rdf")]
    pub input: Option<PathBuf>,

    /// Existing g(r) table: CSV from `analyze rdf` or LAMMPS `fix ave/time` output
    #[arg(long)]
    pub rdf: Option<PathBuf>,

    /// Input format (detected from the file name by default)
    #[arg(short, long, value_enum)]
    pub format: Option<InputFormat>,

    /// Element names for numeric atom types, type 1 first
    #[arg(short, long, value_delimiter = ',')]
    pub elements: Vec<String>,

    /// Frames to analyze as start:stop:stride
    #[arg(long)]
    pub frames: Option<String>,

    /// Number density in atoms/Å³ (required with --rdf)
    #[arg(long)]
    pub density: Option<f64>,

    /// Composition for --rdf tables, e.g. "Al:0.9,Sm:0.1"
    #[arg(long, value_delimiter = ',')]
    pub composition: Vec<String>,

    /// Column labels of a LAMMPS RDF file, e.g. "Al-Al,Al-Sm,Sm-Sm"
    #[arg(long, value_delimiter = ',')]
    pub pairs: Vec<String>,

    /// Total S(q) method [default: direct]
    #[arg(short, long, value_enum)]
    pub method: Option<SqMethod>,

    /// Radiation for Faber-Ziman weights [default: xray]
    #[arg(long, value_enum)]
    pub radiation: Option<Radiation>,

    /// Smallest q in 1/Å [default: 0.5]
    #[arg(long)]
    pub q_min: Option<f64>,

    /// Largest q in 1/Å [default: 20.0]
    #[arg(long)]
    pub q_max: Option<f64>,

    /// Number of q points [default: 400]
    #[arg(long)]
    pub q_points: Option<usize>,

    /// RDF cutoff in Å when computing g(r) [default: 8.0]
    #[arg(short, long)]
    pub cutoff: Option<f64>,

    /// RDF bins when computing g(r) [default: 100]
    #[arg(short, long)]
    pub bins: Option<usize>,

    #[command(flatten)]
    pub output: OutputArgs,
}

// ─────────────────────────────────────────────────────────────
// 拓扑分析
// ─────────────────────────────────────────────────────────────

/// bad 子命令参数
#[derive(Args, Debug)]
pub struct BondAngleArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Bond cutoff in Å, or "auto" for the first minimum of g(r)
    #[arg(short, long, value_parser = parse_cutoff)]
    pub cutoff: Option<CutoffArg>,

    /// Number of angle bins over [0, 180]
    #[arg(short, long, default_value_t = 180)]
    pub bins: usize,
}

/// ha 子命令参数
#[derive(Args, Debug)]
pub struct HaArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Bond cutoff in Å, or "auto" for the first minimum of g(r)
    #[arg(short, long, value_parser = parse_cutoff)]
    pub cutoff: Option<CutoffArg>,

    /// Also classify unbonded pairs (2xxx) up to this distance in Å
    #[arg(long)]
    pub unbonded_cutoff: Option<f64>,

    /// Number of signatures to print
    #[arg(long, default_value_t = 10)]
    pub top: usize,
}

/// voronoi 子命令参数
#[derive(Args, Debug)]
pub struct VoronoiArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Neighbor search radius in Å [default: 2 × mean atomic spacing]
    #[arg(short, long)]
    pub cutoff: Option<f64>,

    /// Drop faces smaller than this fraction of the cell surface [default: 0]
    #[arg(long)]
    pub face_threshold: Option<f64>,

    /// Merge edges shorter than this length in Å [default: 0]
    #[arg(long)]
    pub edge_threshold: Option<f64>,

    /// Number of Voronoi indices to print and plot
    #[arg(long, default_value_t = 15)]
    pub top: usize,

    /// Write every cell of the last analyzed frame to <prefix>_voronoi_cells.csv
    #[arg(long, default_value_t = false)]
    pub per_atom: bool,
}

/// voro-stats 子命令参数
#[derive(Args, Debug)]
pub struct VoroStatsArgs {
    /// Voro++ output written with the custom format "%i %q %v %A"
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// Number of Voronoi indices to print and plot
    #[arg(long, default_value_t = 15)]
    pub top: usize,
}

/// wc 子命令参数
#[derive(Args, Debug)]
pub struct WarrenCowleyArgs {
    #[command(flatten)]
    pub trajectory: TrajectoryArgs,

    #[command(flatten)]
    pub output: OutputArgs,

    /// First-shell cutoff in Å, or "auto" for the first minimum of g(r)
    #[arg(short, long, value_parser = parse_cutoff)]
    pub cutoff: Option<CutoffArg>,
}

// ─────────────────────────────────────────────────────────────
// 状态方程
// ─────────────────────────────────────────────────────────────

/// eos 子命令参数
#[derive(Args, Debug)]
pub struct EosArgs {
    /// Directory of VASP runs (OUTCAR files), a volume/energy CSV, or a LAMMPS log
    #[arg(short, long)]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,

    /// File name pattern for OUTCAR files in directory mode
    #[arg(short, long, default_value = "OUTCAR*")]
    pub pattern: String,

    /// Energy column of a LAMMPS log
    #[arg(long, default_value = "PotEng")]
    pub energy_column: String,

    /// Fit energy and volume per atom
    #[arg(long, default_value_t = false)]
    pub per_atom: bool,

    /// Include unfinished VASP runs
    #[arg(long, default_value_t = false)]
    pub include_unfinished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cutoff() {
        assert_eq!(parse_cutoff("auto"), Ok(CutoffArg::Auto));
        assert_eq!(parse_cutoff("AUTO"), Ok(CutoffArg::Auto));
        assert_eq!(parse_cutoff("3.2"), Ok(CutoffArg::Value(3.2)));
        assert!(parse_cutoff("-1").is_err());
        assert!(parse_cutoff("near").is_err());
    }
}
