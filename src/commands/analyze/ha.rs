//! # Honeycutt-Andersen 子命令实现
//!
//! 打印出现最多的键对指数与公共近邻三元组，导出全部计数。
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 HaArgs
//! - 使用 `analysis/honeycutt_andersen.rs`, `analysis/export.rs`

use super::{frame_selection, load_trajectory, resolve_bond_cutoff, OutputPaths};
use crate::analysis::{export, HaAnalysis, HaParams, HaSummary};
use crate::cli::analyze::HaArgs;
use crate::commands::Context;
use crate::error::Result;
use crate::pipeline;
use crate::utils::{output, progress};

use tabled::Tabled;

#[derive(Tabled)]
struct SignatureRow {
    #[tabled(rename = "Index")]
    signature: String,
    #[tabled(rename = "Count")]
    count: usize,
    #[tabled(rename = "Fraction")]
    fraction: String,
}

#[derive(Tabled)]
struct TripletRow {
    #[tabled(rename = "(j,k,chain)")]
    triplet: String,
    #[tabled(rename = "Count")]
    count: usize,
}

/// 执行 HA 分析
pub fn execute(args: HaArgs, ctx: &Context) -> Result<()> {
    output::print_header("Honeycutt-Andersen Analysis");

    let trajectory = load_trajectory(&args.trajectory, ctx)?;
    let selection = frame_selection(
        args.trajectory.frames.as_deref(),
        args.trajectory.last,
        trajectory.len(),
    )?;
    let cutoff = resolve_bond_cutoff(args.cutoff, None, &trajectory, &selection, ctx)?;
    let params = HaParams {
        cutoff,
        unbonded_cutoff: args.unbonded_cutoff,
    };
    let out = OutputPaths::new(&args.output, &args.trajectory.input, ctx)?;

    match params.unbonded_cutoff {
        Some(outer) => output::print_info(&format!(
            "Bond cutoff {:.3} Å, unbonded pairs up to {:.3} Å",
            cutoff, outer
        )),
        None => output::print_info(&format!("Bond cutoff {:.3} Å", cutoff)),
    }

    let pb = progress::create_frame_bar("honeycutt-andersen");
    let summary = pipeline::run(&trajectory, &selection, HaAnalysis::new(params)?, Some(&pb))?;

    print_summary(&summary, args.top);

    let csv_path = out.csv("ha");
    export::ha_to_csv(&summary, &csv_path)?;
    output::print_success(&format!("HA counts written to {}", csv_path.display()));

    output::print_done(&format!(
        "{} pair(s) classified over {} frame(s)",
        summary.pairs, summary.frames
    ));
    Ok(())
}

fn print_summary(summary: &HaSummary, top: usize) {
    if summary.pairs == 0 {
        output::print_warning("No pairs within the cutoff");
        return;
    }

    let rows: Vec<SignatureRow> = summary
        .signatures
        .iter()
        .take(top)
        .map(|(s, n)| SignatureRow {
            signature: s.to_string(),
            count: *n,
            fraction: format!("{:.4}", *n as f64 / summary.pairs as f64),
        })
        .collect();
    output::print_table(&rows);

    // 常见局部结构的合计
    let icosahedral = summary.fraction("1551");
    let crystalline = summary.fraction("1421") + summary.fraction("1422");
    output::print_kv("Icosahedral (1551)", &format!("{:.4}", icosahedral));
    output::print_kv("fcc/hcp (1421+1422)", &format!("{:.4}", crystalline));

    let triplets: Vec<TripletRow> = summary
        .triplets
        .iter()
        .take(top)
        .map(|(t, n)| TripletRow {
            triplet: t.to_string(),
            count: *n,
        })
        .collect();
    if !triplets.is_empty() {
        output::print_table(&triplets);
    }
}
