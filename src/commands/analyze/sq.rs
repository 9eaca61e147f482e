//! # S(q) 分析子命令实现
//!
//! 两种输入：
//! - 结构/轨迹：先计算 g(r)，密度与组成取自结构
//! - 已有 g(r) 表（`--rdf`）：CSV 或 LAMMPS `fix ave/time` 输出，需给出 `--density`，
//!   Faber-Ziman 方法还需 `--composition`
//! - 默认方法为 direct（变换总 g(r)）；只有偏分布的表需 `--method faber-ziman`
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 SqArgs
//! - 使用 `analysis/structure_factor.rs`, `parsers/tables.rs`, `parsers/lammps_rdf.rs`

use super::{frame_selection, rdf_params, OutputPaths};
use crate::analysis::structure_factor::{partial_structure_factors, total_structure_factor};
use crate::analysis::{export, plot, QGrid, Radiation, RdfAnalysis, SqMethod, SqResult};
use crate::cli::analyze::{SqArgs, TrajectoryArgs};
use crate::commands::Context;
use crate::config::pick;
use crate::error::{MdlabError, Result};
use crate::parsers::lammps_rdf::parse_lammps_rdf_file;
use crate::parsers::tables::{read_rdf_csv, RdfTable};
use crate::pipeline;
use crate::utils::{output, progress};

use std::path::Path;

/// 执行 S(q) 分析
pub fn execute(args: SqArgs, ctx: &Context) -> Result<()> {
    output::print_header("Static Structure Factor");

    let cfg = &ctx.config.sq;
    let defaults = QGrid::default();
    let grid = QGrid {
        q_min: pick(args.q_min, cfg.q_min, defaults.q_min),
        q_max: pick(args.q_max, cfg.q_max, defaults.q_max),
        points: pick(args.q_points, cfg.points, defaults.points),
    };
    let method = pick(args.method, cfg.method, SqMethod::default());
    let radiation = pick(args.radiation, cfg.radiation, Radiation::default());

    let (table, density, composition, input) = match (&args.rdf, &args.input) {
        (Some(rdf_path), _) => {
            let table = read_table(rdf_path, &args.pairs)?;
            let density = args.density.ok_or_else(|| {
                MdlabError::InvalidArgument("--density is required with --rdf".to_string())
            })?;
            let composition = parse_composition(&args.composition)?;
            (table, density, composition, rdf_path.clone())
        }
        (None, Some(input)) => {
            let (table, density, composition) = table_from_trajectory(&args, input, ctx)?;
            (table, density, composition, input.clone())
        }
        (None, None) => {
            return Err(MdlabError::InvalidArgument(
                "Give a structure with --input or a g(r) table with --rdf".to_string(),
            ))
        }
    };

    if !(density > 0.0) {
        return Err(MdlabError::InvalidArgument(format!(
            "Number density must be positive, got {}",
            density
        )));
    }
    if method == SqMethod::FaberZiman && composition.is_empty() {
        return Err(MdlabError::InvalidArgument(
            "The faber-ziman method needs --composition (e.g. \"Al:0.9,Sm:0.1\")".to_string(),
        ));
    }

    output::print_info(&format!(
        "q = {:.2}..{:.2} 1/Å ({} points), method {}, radiation {}, ρ = {:.5} Å⁻³",
        grid.q_min, grid.q_max, grid.points, method, radiation, density
    ));

    let mut result = total_structure_factor(&table, density, &grid, method, &composition, radiation)?;
    if method == SqMethod::Direct && !table.partials().is_empty() {
        let partials = partial_structure_factors(&table, density, &grid)?;
        result.pairs = partials.pairs;
        result.partial = partials.partial;
    }

    print_summary(&result);

    let out = OutputPaths::new(&args.output, &input, ctx)?;
    let csv_path = out.csv("sq");
    export::sq_to_csv(&result, &csv_path)?;
    output::print_success(&format!("S(q) data written to {}", csv_path.display()));

    if out.plot {
        let img = out.image("sq");
        plot::generate_sq_plot(&result, &img, &format!("S(q) of {}", out.prefix), &out.style)?;
        output::print_success(&format!("S(q) plot written to {}", img.display()));
    }

    output::print_done("Structure factor complete");
    Ok(())
}

/// CSV 按列名读取，其他文件按 LAMMPS RDF 格式读取
fn read_table(path: &Path, pairs: &[String]) -> Result<RdfTable> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        read_rdf_csv(path)
    } else {
        if pairs.is_empty() {
            log::warn!("No --pairs given; LAMMPS RDF columns are named pair1, pair2, ...");
        }
        parse_lammps_rdf_file(path, pairs)
    }
}

/// 由结构计算 g(r)：返回 (表, 密度, 组成)
fn table_from_trajectory(
    args: &SqArgs,
    input: &Path,
    ctx: &Context,
) -> Result<(RdfTable, f64, Vec<(String, f64)>)> {
    let traj_args = TrajectoryArgs {
        input: input.to_path_buf(),
        format: args.format,
        elements: args.elements.clone(),
        frames: args.frames.clone(),
        last: false,
    };
    let trajectory = super::load_trajectory(&traj_args, ctx)?;
    let selection = frame_selection(args.frames.as_deref(), false, trajectory.len())?;
    let params = rdf_params(ctx, args.cutoff, args.bins, false, None, None)?;

    let pb = progress::create_frame_bar("rdf");
    let rdf = pipeline::run(
        &trajectory,
        &selection,
        RdfAnalysis::new(params, Vec::new())?,
        Some(&pb),
    )?;

    let composition: Vec<(String, f64)> = rdf
        .species
        .iter()
        .cloned()
        .zip(rdf.composition.iter().copied())
        .collect();
    Ok((rdf.to_table()?, rdf.density, composition))
}

/// 解析 "Al:0.9,Sm:0.1" 形式的组成
pub fn parse_composition(items: &[String]) -> Result<Vec<(String, f64)>> {
    items
        .iter()
        .map(|item| {
            let (el, c) = item.split_once(':').ok_or_else(|| {
                MdlabError::InvalidArgument(format!("Expected Element:fraction, got '{}'", item))
            })?;
            let c: f64 = c.trim().parse().map_err(|_| {
                MdlabError::InvalidArgument(format!("Bad fraction in '{}'", item))
            })?;
            Ok((el.trim().to_string(), c))
        })
        .collect()
}

fn print_summary(result: &SqResult) {
    let Some(total) = &result.total else {
        return;
    };
    let peak = total
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(k, s)| (result.q[k], *s));
    if let Some((q, s)) = peak {
        output::print_kv("Main peak", &format!("q = {:.3} 1/Å, S = {:.3}", q, s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_composition() {
        let comp = parse_composition(&["Al:0.9".to_string(), " Sm : 0.1".to_string()]).unwrap();
        assert_eq!(comp, vec![("Al".to_string(), 0.9), ("Sm".to_string(), 0.1)]);
        assert!(parse_composition(&["Al0.9".to_string()]).is_err());
        assert!(parse_composition(&["Al:x".to_string()]).is_err());
        assert!(parse_composition(&[]).unwrap().is_empty());
    }
}
