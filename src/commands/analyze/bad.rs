//! # 键角分布子命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 BondAngleArgs
//! - 使用 `analysis/bond_angle.rs`, `analysis/export.rs`, `analysis/plot.rs`

use super::{frame_selection, load_trajectory, resolve_bond_cutoff, OutputPaths};
use crate::analysis::{export, plot, BondAngleAnalysis, BondAngleParams, BondAngleResult};
use crate::cli::analyze::BondAngleArgs;
use crate::commands::Context;
use crate::error::Result;
use crate::pipeline;
use crate::utils::{output, progress};

use tabled::Tabled;

#[derive(Tabled)]
struct PeakRow {
    #[tabled(rename = "Center")]
    center: String,
    #[tabled(rename = "Peak (°)")]
    peak: String,
    #[tabled(rename = "Mean (°)")]
    mean: String,
}

/// 执行键角分布分析
pub fn execute(args: BondAngleArgs, ctx: &Context) -> Result<()> {
    output::print_header("Bond Angle Distribution");

    let trajectory = load_trajectory(&args.trajectory, ctx)?;
    let selection = frame_selection(
        args.trajectory.frames.as_deref(),
        args.trajectory.last,
        trajectory.len(),
    )?;
    let defaults = BondAngleParams::default();
    let cutoff = resolve_bond_cutoff(
        args.cutoff,
        Some(defaults.cutoff),
        &trajectory,
        &selection,
        ctx,
    )?;
    let params = BondAngleParams {
        cutoff,
        bins: args.bins,
    };
    let out = OutputPaths::new(&args.output, &args.trajectory.input, ctx)?;
    output::print_info(&format!("Bond cutoff {:.3} Å, {} bins", cutoff, params.bins));

    let pb = progress::create_frame_bar("bond-angle");
    let result = pipeline::run(&trajectory, &selection, BondAngleAnalysis::new(params)?, Some(&pb))?;

    print_summary(&result);

    let csv_path = out.csv("bad");
    export::bond_angle_to_csv(&result, &csv_path)?;
    output::print_success(&format!("Bond angle data written to {}", csv_path.display()));

    if out.plot {
        let img = out.image("bad");
        plot::generate_bond_angle_plot(
            &result,
            &img,
            &format!("Bond angles of {}", out.prefix),
            &out.style,
        )?;
        output::print_success(&format!("Bond angle plot written to {}", img.display()));
    }

    output::print_done(&format!(
        "{} bond angle(s) over {} frame(s)",
        result.triplets, result.frames
    ));
    Ok(())
}

/// 分布的 (峰位, 平均角)
fn peak_and_mean(angle: &[f64], p: &[f64]) -> Option<(f64, f64)> {
    let norm: f64 = p.iter().sum();
    if norm <= 0.0 {
        return None;
    }
    let peak = p
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(k, _)| angle[k])?;
    let mean = angle.iter().zip(p).map(|(a, w)| a * w).sum::<f64>() / norm;
    Some((peak, mean))
}

fn print_summary(result: &BondAngleResult) {
    let mut rows = Vec::new();
    if let Some((peak, mean)) = peak_and_mean(&result.angle, &result.total) {
        rows.push(PeakRow {
            center: "all".to_string(),
            peak: format!("{:.1}", peak),
            mean: format!("{:.2}", mean),
        });
    }
    for (species, p) in &result.partial {
        if let Some((peak, mean)) = peak_and_mean(&result.angle, p) {
            rows.push(PeakRow {
                center: species.clone(),
                peak: format!("{:.1}", peak),
                mean: format!("{:.2}", mean),
            });
        }
    }
    if rows.is_empty() {
        output::print_warning("No bond angles found; is the cutoff too small?");
    } else {
        output::print_table(&rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_and_mean() {
        let angle = vec![45.0, 90.0, 135.0];
        let (peak, mean) = peak_and_mean(&angle, &[0.0, 3.0, 1.0]).unwrap();
        assert_eq!(peak, 90.0);
        assert!((mean - 101.25).abs() < 1e-12);
        assert!(peak_and_mean(&angle, &[0.0, 0.0, 0.0]).is_none());
    }
}
