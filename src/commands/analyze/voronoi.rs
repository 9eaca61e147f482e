//! # Voronoi 子命令实现
//!
//! - `voronoi`：对轨迹做 Voronoi 剖分，统计指数直方图与各元素平均体积
//! - `voro-stats`：读取 Voro++ 自定义输出（`%i %q %v %A`），只做统计
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 VoronoiArgs, VoroStatsArgs
//! - 使用 `analysis/voronoi.rs`, `parsers/voro.rs`
//! - 使用 `analysis/export.rs`, `analysis/plot.rs`

use super::{frame_selection, load_trajectory, OutputPaths};
use crate::analysis::voronoi::{default_cutoff, VoronoiIndex};
use crate::analysis::{export, plot, VoronoiAnalysis, VoronoiParams, VoronoiSummary};
use crate::cli::analyze::{VoroStatsArgs, VoronoiArgs};
use crate::commands::Context;
use crate::config::pick;
use crate::error::{MdlabError, Result};
use crate::parsers::voro::{parse_voro_output_file, VoroRecord};
use crate::pipeline;
use crate::utils::{output, progress};

use std::collections::HashMap;
use tabled::Tabled;

#[derive(Tabled)]
struct IndexRow {
    #[tabled(rename = "Voronoi index")]
    index: String,
    #[tabled(rename = "Faces")]
    faces: usize,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Fraction")]
    fraction: String,
}

#[derive(Tabled)]
struct VolumeRow {
    #[tabled(rename = "Element")]
    element: String,
    #[tabled(rename = "Cells")]
    cells: usize,
    #[tabled(rename = "Mean volume (Å³)")]
    volume: String,
}

/// 执行 Voronoi 分析
pub fn execute(args: VoronoiArgs, ctx: &Context) -> Result<()> {
    output::print_header("Voronoi Tessellation");

    let trajectory = load_trajectory(&args.trajectory, ctx)?;
    let selection = frame_selection(
        args.trajectory.frames.as_deref(),
        args.trajectory.last,
        trajectory.len(),
    )?;

    let cfg = &ctx.config.voronoi;
    let defaults = VoronoiParams::default();
    let params = VoronoiParams {
        cutoff: args.cutoff.or(cfg.cutoff),
        face_area_threshold: pick(
            args.face_threshold,
            cfg.face_area_threshold,
            defaults.face_area_threshold,
        ),
        edge_threshold: pick(args.edge_threshold, cfg.edge_threshold, defaults.edge_threshold),
    };
    let cutoff = match params.cutoff {
        Some(c) => c,
        None => {
            let first = trajectory
                .select(&selection)?
                .into_iter()
                .next()
                .ok_or(MdlabError::EmptySelection {
                    frames: trajectory.len(),
                })?;
            default_cutoff(first)
        }
    };
    let out = OutputPaths::new(&args.output, &args.trajectory.input, ctx)?;
    output::print_info(&format!(
        "Search radius {:.3} Å, face threshold {}, edge threshold {} Å",
        cutoff, params.face_area_threshold, params.edge_threshold
    ));

    let pb = progress::create_frame_bar("voronoi");
    let summary = pipeline::run(
        &trajectory,
        &selection,
        VoronoiAnalysis::new(params, cutoff)?,
        Some(&pb),
    )?;

    print_summary(&summary, args.top);
    if summary.incomplete > 0 {
        output::print_warning(&format!(
            "{} of {} cell(s) are incomplete; raise --cutoff",
            summary.incomplete, summary.cells
        ));
    }
    if let Some(err) = summary.max_volume_error {
        output::print_kv("Max volume sum error", &format!("{:.2e}", err));
    }

    write_outputs(&summary, &out, args.top)?;
    if args.per_atom {
        let cells_path = out.csv("voronoi_cells");
        export::voronoi_cells_to_csv(&summary.last_frame, &cells_path)?;
        output::print_success(&format!("Per-atom cells written to {}", cells_path.display()));
    }

    output::print_done(&format!(
        "{} cell(s) over {} frame(s)",
        summary.cells, summary.frames
    ));
    Ok(())
}

/// 执行 Voro++ 输出统计
pub fn execute_stats(args: VoroStatsArgs, ctx: &Context) -> Result<()> {
    output::print_header("Voro++ Index Statistics");

    let records = parse_voro_output_file(&args.input)?;
    output::print_info(&format!(
        "Read {} cell(s) from '{}'",
        records.len(),
        args.input.display()
    ));

    let summary = summary_from_records(&records);
    let out = OutputPaths::new(&args.output, &args.input, ctx)?;

    print_summary(&summary, args.top);
    write_outputs(&summary, &out, args.top)?;

    output::print_done(&format!("{} cell(s) analyzed", summary.cells));
    Ok(())
}

/// Voro++ 记录的统计；没有元素信息，体积按 "all" 汇总
pub fn summary_from_records(records: &[VoroRecord]) -> VoronoiSummary {
    let mut counts: HashMap<VoronoiIndex, usize> = HashMap::new();
    for record in records {
        *counts.entry(VoronoiIndex(record.index())).or_insert(0) += 1;
    }
    let mut histogram: Vec<(VoronoiIndex, usize)> = counts.into_iter().collect();
    histogram.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let total: f64 = records.iter().map(|r| r.volume).sum();
    let species_volumes = if records.is_empty() {
        Vec::new()
    } else {
        vec![("all".to_string(), total / records.len() as f64, records.len())]
    };

    VoronoiSummary {
        histogram,
        species_volumes,
        cells: records.len(),
        incomplete: 0,
        frames: 1,
        max_volume_error: None,
        last_frame: Vec::new(),
    }
}

fn print_summary(summary: &VoronoiSummary, top: usize) {
    let rows: Vec<IndexRow> = summary
        .histogram
        .iter()
        .take(top)
        .map(|(index, n)| IndexRow {
            index: index.to_string(),
            faces: index.faces(),
            count: *n,
            fraction: format!("{:.4}", *n as f64 / summary.cells.max(1) as f64),
        })
        .collect();
    if !rows.is_empty() {
        output::print_table(&rows);
    }

    let volumes: Vec<VolumeRow> = summary
        .species_volumes
        .iter()
        .map(|(el, v, n)| VolumeRow {
            element: el.clone(),
            cells: *n,
            volume: format!("{:.4}", v),
        })
        .collect();
    if !volumes.is_empty() {
        output::print_table(&volumes);
    }
}

fn write_outputs(summary: &VoronoiSummary, out: &OutputPaths, top: usize) -> Result<()> {
    let csv_path = out.csv("voronoi");
    export::voronoi_histogram_to_csv(summary, &csv_path)?;
    output::print_success(&format!("Voronoi histogram written to {}", csv_path.display()));

    if out.plot && !summary.histogram.is_empty() {
        let img = out.image("voronoi");
        plot::generate_voronoi_plot(
            summary,
            top,
            &img,
            &format!("Voronoi indices of {}", out.prefix),
            &out.style,
        )?;
        output::print_success(&format!("Voronoi plot written to {}", img.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, volume: f64, face_orders: Vec<usize>) -> VoroRecord {
        VoroRecord {
            id,
            position: [0.0; 3],
            volume,
            face_orders,
        }
    }

    #[test]
    fn test_summary_from_records() {
        let icosahedron = vec![0, 0, 0, 0, 0, 12];
        let records = vec![
            record(1, 16.0, icosahedron.clone()),
            record(2, 18.0, vec![0, 0, 0, 0, 2, 8, 4]),
            record(3, 17.0, icosahedron),
        ];
        let summary = summary_from_records(&records);

        assert_eq!(summary.cells, 3);
        assert_eq!(summary.histogram[0], (VoronoiIndex([0, 0, 12, 0, 0]), 2));
        assert_eq!(summary.histogram[1].0.to_string(), "<0,2,8,4>");
        assert_eq!(summary.species_volumes, vec![("all".to_string(), 17.0, 3)]);
    }
}
