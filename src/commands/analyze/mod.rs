//! # analyze 命令实现
//!
//! 分析功能统一入口，包含多个子命令：
//! - `rdf`: 径向分布函数
//! - `sq`: 静态结构因子
//! - `bad`: 键角分布
//! - `ha`: Honeycutt-Andersen 键对分析
//! - `voronoi` / `voro-stats`: Voronoi 多面体
//! - `wc`: Warren-Cowley 化学短程序
//! - `eos`: 状态方程拟合
//!
//! 本文件同时提供各子命令共用的轨迹读取、帧选择、截断解析与输出路径。
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的参数
//! - 使用 `pipeline.rs`, `analysis/`, `parsers/`
//! - 子模块: rdf, sq, bad, ha, voronoi, wc, eos

pub mod bad;
pub mod eos;
pub mod ha;
pub mod rdf;
pub mod sq;
pub mod voronoi;
pub mod wc;

use crate::analysis::plot::PlotStyle;
use crate::analysis::{RdfAnalysis, RdfParams, SavitzkyGolay};
use crate::cli::analyze::{AnalyzeArgs, AnalyzeCommands, CutoffArg, OutputArgs, TrajectoryArgs};
use crate::commands::Context;
use crate::config::pick;
use crate::error::{MdlabError, Result};
use crate::models::{FrameSelection, Trajectory};
use crate::parsers::{self, ReadOptions};
use crate::pipeline;
use crate::utils::{output, progress};

use std::fs;
use std::path::{Path, PathBuf};

/// 执行 analyze 命令
pub fn execute(args: AnalyzeArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AnalyzeCommands::Rdf(a) => rdf::execute(a, ctx),
        AnalyzeCommands::Sq(a) => sq::execute(a, ctx),
        AnalyzeCommands::Bad(a) => bad::execute(a, ctx),
        AnalyzeCommands::Ha(a) => ha::execute(a, ctx),
        AnalyzeCommands::Voronoi(a) => voronoi::execute(a, ctx),
        AnalyzeCommands::VoroStats(a) => voronoi::execute_stats(a, ctx),
        AnalyzeCommands::Wc(a) => wc::execute(a, ctx),
        AnalyzeCommands::Eos(a) => eos::execute(a, ctx),
    }
}

// ─────────────────────────────────────────────────────────────
// 输入
// ─────────────────────────────────────────────────────────────

/// 读取轨迹并打印概要
pub(crate) fn load_trajectory(args: &TrajectoryArgs, ctx: &Context) -> Result<Trajectory> {
    let options = ReadOptions {
        format: args.format,
        elements: ctx.elements(&args.elements),
    };

    let spinner = progress::create_spinner(&format!("Reading {}", args.input.display()));
    let trajectory = parsers::read_trajectory(&args.input, &options);
    spinner.finish_and_clear();
    let trajectory = trajectory?;
    trajectory.check_consistent()?;

    if let Some(first) = trajectory.first() {
        output::print_info(&format!(
            "Read {} frame(s) of {} ({} atoms) from '{}'",
            trajectory.len(),
            first.formula(),
            first.len(),
            args.input.display()
        ));
    }
    Ok(trajectory)
}

/// `--frames` / `--last` 转为帧选择
pub(crate) fn frame_selection(frames: Option<&str>, last: bool, n_frames: usize) -> Result<FrameSelection> {
    if last {
        return Ok(FrameSelection::last(n_frames));
    }
    match frames {
        Some(s) => FrameSelection::parse(s),
        None => Ok(FrameSelection::default()),
    }
}

/// 由命令行与配置构造 RDF 参数
pub(crate) fn rdf_params(
    ctx: &Context,
    cutoff: Option<f64>,
    bins: Option<usize>,
    no_smooth: bool,
    window: Option<usize>,
    order: Option<usize>,
) -> Result<RdfParams> {
    let cfg = &ctx.config.rdf;
    let defaults = RdfParams::default();
    let sg = SavitzkyGolay::default();

    let smooth = !no_smooth && cfg.smooth.unwrap_or(true);
    let smoothing = if smooth {
        Some(SavitzkyGolay::new(
            pick(window, cfg.smooth_window, sg.window),
            pick(order, cfg.smooth_order, sg.order),
        )?)
    } else {
        None
    };

    Ok(RdfParams {
        cutoff: pick(cutoff, cfg.cutoff, defaults.cutoff),
        bins: pick(bins, cfg.bins, defaults.bins),
        smoothing,
    })
}

/// 键长截断：命令行 > 配置 `[neighbors] cutoff` > `fallback`；
/// `fallback` 为 None 时取 g(r) 第一极小
pub(crate) fn resolve_bond_cutoff(
    arg: Option<CutoffArg>,
    fallback: Option<f64>,
    trajectory: &Trajectory,
    selection: &FrameSelection,
    ctx: &Context,
) -> Result<f64> {
    match arg {
        Some(CutoffArg::Value(v)) => return Ok(v),
        Some(CutoffArg::Auto) => {}
        None => {
            if let Some(v) = ctx.config.neighbors.cutoff.or(fallback) {
                return Ok(v);
            }
        }
    }

    let params = rdf_params(ctx, None, None, false, None, None)?;
    let pb = progress::create_frame_bar("rdf");
    let rdf = pipeline::run(
        trajectory,
        selection,
        RdfAnalysis::new(params, Vec::new())?,
        Some(&pb),
    )?;
    let cutoff = rdf.first_minimum().ok_or_else(|| {
        MdlabError::InvalidArgument(
            "Could not locate the first minimum of g(r); give --cutoff explicitly".to_string(),
        )
    })?;
    output::print_info(&format!("Bond cutoff from first minimum of g(r): {:.3} Å", cutoff));
    Ok(cutoff)
}

// ─────────────────────────────────────────────────────────────
// 输出
// ─────────────────────────────────────────────────────────────

/// 输出目录、文件名前缀与绘图设置
#[derive(Debug, Clone)]
pub(crate) struct OutputPaths {
    pub dir: PathBuf,
    pub prefix: String,
    pub style: PlotStyle,
    pub plot: bool,
}

impl OutputPaths {
    /// 创建输出目录；前缀默认取输入文件名
    pub fn new(args: &OutputArgs, input: &Path, ctx: &Context) -> Result<Self> {
        let cfg = &ctx.config.output;
        let dir = args
            .output
            .clone()
            .or_else(|| cfg.dir.clone())
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&dir).map_err(|e| MdlabError::FileWriteError {
            path: dir.display().to_string(),
            source: e,
        })?;

        let prefix = args.prefix.clone().unwrap_or_else(|| default_prefix(input));
        let defaults = PlotStyle::default();
        let style = PlotStyle {
            width: cfg.width.unwrap_or(defaults.width),
            height: cfg.height.unwrap_or(defaults.height),
            use_svg: args.svg || cfg.svg.unwrap_or(false),
        };

        Ok(OutputPaths {
            dir,
            prefix,
            style,
            plot: !args.no_plot,
        })
    }

    /// `<dir>/<prefix>_<suffix>.csv`
    pub fn csv(&self, suffix: &str) -> PathBuf {
        self.dir.join(format!("{}_{}.csv", self.prefix, suffix))
    }

    /// `<dir>/<prefix>_<suffix>.png|svg`
    pub fn image(&self, suffix: &str) -> PathBuf {
        let ext = if self.style.use_svg { "svg" } else { "png" };
        self.dir.join(format!("{}_{}.{}", self.prefix, suffix, ext))
    }
}

fn default_prefix(input: &Path) -> String {
    let name = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("mdlab");
    name.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::test_support::fcc;

    #[test]
    fn test_frame_selection() {
        assert_eq!(frame_selection(None, true, 5).unwrap().indices(5), vec![4]);
        assert_eq!(frame_selection(None, false, 5).unwrap(), FrameSelection::default());
        assert_eq!(
            frame_selection(Some("2:10:2"), false, 5).unwrap(),
            FrameSelection::parse("2:10:2").unwrap()
        );
    }

    #[test]
    fn test_rdf_params_precedence() {
        let config = Config::from_toml_str("[rdf]\ncutoff = 6.0\nbins = 50\nsmooth = false\n", "t").unwrap();
        let ctx = Context { config, jobs: 1 };

        let p = rdf_params(&ctx, Some(5.0), None, false, None, None).unwrap();
        assert_eq!(p.cutoff, 5.0);
        assert_eq!(p.bins, 50);
        assert!(p.smoothing.is_none());

        let p = rdf_params(&Context::default(), None, None, false, Some(9), None).unwrap();
        assert_eq!(p.cutoff, 8.0);
        assert_eq!(p.smoothing, Some(SavitzkyGolay { window: 9, order: 3 }));

        assert!(rdf_params(&Context::default(), None, None, false, Some(8), None).is_err());
    }

    #[test]
    fn test_resolve_bond_cutoff() {
        let trajectory = Trajectory::single(fcc(4.05, 3, "Al"));
        let sel = FrameSelection::default();
        let ctx = Context::default();

        let v = resolve_bond_cutoff(Some(CutoffArg::Value(3.1)), None, &trajectory, &sel, &ctx).unwrap();
        assert_eq!(v, 3.1);
        let v = resolve_bond_cutoff(None, Some(3.0), &trajectory, &sel, &ctx).unwrap();
        assert_eq!(v, 3.0);

        let config = Config::from_toml_str("[neighbors]\ncutoff = 3.4\n", "t").unwrap();
        let with_config = Context { config, jobs: 1 };
        let v = resolve_bond_cutoff(None, Some(3.0), &trajectory, &sel, &with_config).unwrap();
        assert_eq!(v, 3.4);

        // fcc 第一近邻 2.86 Å，第二近邻 4.05 Å，第一极小落在两者之间
        let v = resolve_bond_cutoff(Some(CutoffArg::Auto), None, &trajectory, &sel, &ctx).unwrap();
        assert!(v > 2.9 && v < 4.05, "auto cutoff {}", v);
    }

    #[test]
    fn test_output_paths() {
        let dir = std::env::temp_dir().join(format!("mdlab_out_{}", std::process::id()));
        let args = OutputArgs {
            output: Some(dir.clone()),
            prefix: None,
            svg: true,
            no_plot: false,
        };
        let paths = OutputPaths::new(&args, Path::new("run/dump.melt"), &Context::default()).unwrap();
        assert!(dir.is_dir());
        assert_eq!(paths.csv("rdf"), dir.join("dump_melt_rdf.csv"));
        assert_eq!(paths.image("rdf"), dir.join("dump_melt_rdf.svg"));
        fs::remove_dir_all(&dir).ok();
    }
}
