//! # Warren-Cowley 子命令实现
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 WarrenCowleyArgs
//! - 使用 `analysis/warren_cowley.rs`, `analysis/export.rs`

use super::{frame_selection, load_trajectory, resolve_bond_cutoff, OutputPaths};
use crate::analysis::{export, WarrenCowleyAnalysis, WarrenCowleyResult};
use crate::cli::analyze::WarrenCowleyArgs;
use crate::commands::Context;
use crate::error::Result;
use crate::pipeline;
use crate::utils::{output, progress};

use tabled::builder::Builder;
use tabled::settings::Style;

/// 执行 Warren-Cowley 分析
pub fn execute(args: WarrenCowleyArgs, ctx: &Context) -> Result<()> {
    output::print_header("Warren-Cowley Short-Range Order");

    let trajectory = load_trajectory(&args.trajectory, ctx)?;
    let selection = frame_selection(
        args.trajectory.frames.as_deref(),
        args.trajectory.last,
        trajectory.len(),
    )?;
    let cutoff = resolve_bond_cutoff(args.cutoff, None, &trajectory, &selection, ctx)?;
    let out = OutputPaths::new(&args.output, &args.trajectory.input, ctx)?;
    output::print_info(&format!("First-shell cutoff {:.3} Å", cutoff));

    let pb = progress::create_frame_bar("warren-cowley");
    let result = pipeline::run(
        &trajectory,
        &selection,
        WarrenCowleyAnalysis::new(cutoff)?,
        Some(&pb),
    )?;

    println!("{}", alpha_table(&result));

    let csv_path = out.csv("wc");
    export::warren_cowley_to_csv(&result, &csv_path)?;
    output::print_success(&format!("Warren-Cowley matrix written to {}", csv_path.display()));

    output::print_done(&format!("α averaged over {} frame(s)", result.frames));
    Ok(())
}

/// α_ab 矩阵表格，附浓度与平均配位数
fn alpha_table(result: &WarrenCowleyResult) -> String {
    let mut builder = Builder::default();

    let mut header = vec!["center".to_string(), "c".to_string(), "CN".to_string()];
    header.extend(result.species.iter().map(|s| format!("α(·,{})", s)));
    builder.push_record(header);

    for (a, species) in result.species.iter().enumerate() {
        let mut row = vec![
            species.clone(),
            format!("{:.4}", result.composition[a]),
            format!("{:.2}", result.coordination[a]),
        ];
        row.extend(result.alpha[a].iter().map(|v| format_alpha(*v)));
        builder.push_record(row);
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

/// 无近邻的中心元素（NaN）显示为 n/a
fn format_alpha(v: f64) -> String {
    if v.is_nan() {
        "n/a".to_string()
    } else {
        format!("{:+.4}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alpha_table() {
        let result = WarrenCowleyResult {
            species: vec!["Cu".to_string(), "Zn".to_string()],
            composition: vec![0.5, 0.5],
            alpha: vec![vec![1.0, -1.0], vec![-1.0, 1.0]],
            coordination: vec![8.0, 8.0],
            frames: 1,
        };
        let table = alpha_table(&result);
        assert!(table.contains("α(·,Zn)"));
        assert!(table.contains("-1.0000"));
        assert!(table.contains("+1.0000"));
    }

    #[test]
    fn test_undefined_row_shows_na() {
        let result = WarrenCowleyResult {
            species: vec!["Al".to_string(), "Sm".to_string()],
            composition: vec![0.9, 0.1],
            alpha: vec![vec![-0.01, 0.1], vec![f64::NAN, f64::NAN]],
            coordination: vec![6.0, 0.0],
            frames: 1,
        };
        let table = alpha_table(&result);
        assert!(table.contains("n/a"));
        assert!(!table.contains("NaN"));
    }
}
