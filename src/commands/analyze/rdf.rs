//! # RDF 分析子命令实现
//!
//! 计算径向分布函数，导出 CSV 与图像，并打印第一极小处的配位数。
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 RdfArgs
//! - 使用 `analysis/rdf.rs`, `analysis/export.rs`, `analysis/plot.rs`

use super::{frame_selection, load_trajectory, rdf_params, OutputPaths};
use crate::analysis::{export, plot, RdfAnalysis, RdfResult};
use crate::cli::analyze::RdfArgs;
use crate::commands::Context;
use crate::error::Result;
use crate::pipeline;
use crate::utils::{output, progress};

use tabled::Tabled;

#[derive(Tabled)]
struct CoordinationRow {
    #[tabled(rename = "Center")]
    center: String,
    #[tabled(rename = "Neighbor")]
    neighbor: String,
    #[tabled(rename = "CN")]
    cn: String,
}

/// 执行 RDF 分析
pub fn execute(args: RdfArgs, ctx: &Context) -> Result<()> {
    output::print_header("Radial Distribution Function");

    let trajectory = load_trajectory(&args.trajectory, ctx)?;
    let selection = frame_selection(
        args.trajectory.frames.as_deref(),
        args.trajectory.last,
        trajectory.len(),
    )?;
    let params = rdf_params(
        ctx,
        args.cutoff,
        args.bins,
        args.no_smooth,
        args.smooth_window,
        args.smooth_order,
    )?;
    let out = OutputPaths::new(&args.output, &args.trajectory.input, ctx)?;

    output::print_info(&format!(
        "Cutoff {:.2} Å, {} bins{}",
        params.cutoff,
        params.bins,
        match params.smoothing {
            Some(sg) => format!(", Savitzky-Golay {}/{}", sg.window, sg.order),
            None => String::new(),
        }
    ));

    let pb = progress::create_frame_bar("rdf");
    let result = pipeline::run(
        &trajectory,
        &selection,
        RdfAnalysis::new(params, Vec::new())?,
        Some(&pb),
    )?;

    print_summary(&result);

    let csv_path = out.csv("rdf");
    export::rdf_to_csv(&result, &csv_path)?;
    output::print_success(&format!("RDF data written to {}", csv_path.display()));

    if out.plot {
        let img = out.image("rdf");
        plot::generate_rdf_plot(&result, &img, &format!("g(r) of {}", out.prefix), &out.style)?;
        output::print_success(&format!("RDF plot written to {}", img.display()));
    }

    output::print_done(&format!("RDF averaged over {} frame(s)", result.frames));
    Ok(())
}

fn print_summary(result: &RdfResult) {
    output::print_kv("Number density", &format!("{:.5} Å⁻³", result.density));

    let Some(r_min) = result.first_minimum() else {
        output::print_warning("No first minimum found in g(r) within the cutoff");
        return;
    };
    output::print_kv("First minimum", &format!("{:.3} Å", r_min));

    let mut rows = Vec::new();
    for a in &result.species {
        for b in &result.species {
            if let Some(cn) = result.coordination_at(a, b, r_min) {
                rows.push(CoordinationRow {
                    center: a.clone(),
                    neighbor: b.clone(),
                    cn: format!("{:.3}", cn),
                });
            }
        }
    }
    output::print_table(&rows);
}
