//! # 状态方程子命令实现
//!
//! ## 输入
//! - 目录：递归收集 OUTCAR（`--pattern`），每个计算给出一个 E-V 点，
//!   OUTCAR 中缺少能量时回退到同目录的 OSZICAR；未完成的计算默认跳过
//! - `*.csv`：volume,energy[,label]
//! - 其他文件：LAMMPS log，每个含 `Volume` 列的 thermo 块给出一个点
//!
//! ## 依赖关系
//! - 使用 `cli/analyze.rs` 定义的 EosArgs
//! - 使用 `batch/`, `parsers/outcar.rs`, `parsers/oszicar.rs`, `parsers/lammps_log.rs`
//! - 使用 `analysis/eos.rs`, `analysis/export.rs`, `analysis/plot.rs`

use super::OutputPaths;
use crate::analysis::eos::EV_PER_A3_TO_GPA;
use crate::analysis::{export, fit_birch_murnaghan, plot, EosFit};
use crate::batch::{BatchRunner, FileCollector, Outcome};
use crate::cli::analyze::EosArgs;
use crate::commands::Context;
use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;
use crate::parsers::{lammps_log, oszicar, outcar, tables};
use crate::utils::output;

use std::path::Path;
use tabled::Tabled;

#[derive(Tabled)]
struct PointRow {
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "V (Å³)")]
    volume: String,
    #[tabled(rename = "E (eV)")]
    energy: String,
    #[tabled(rename = "E - E_fit (meV)")]
    residual: String,
}

/// 执行 EOS 拟合
pub fn execute(args: EosArgs, ctx: &Context) -> Result<()> {
    output::print_header("Birch-Murnaghan Equation of State");

    let points = collect_points(&args, ctx)?;
    let points = if args.per_atom {
        per_atom(points)?
    } else {
        points
    };
    output::print_info(&format!("Fitting {} E-V point(s)", points.len()));

    let fit = fit_birch_murnaghan(&points)?;
    print_summary(&points, &fit, args.per_atom);

    let out = OutputPaths::new(&args.output, &args.input, ctx)?;
    let csv_path = out.csv("eos");
    export::eos_to_csv(&points, &fit, &csv_path)?;
    output::print_success(&format!("E-V data written to {}", csv_path.display()));

    if out.plot {
        let img = out.image("eos");
        plot::generate_eos_plot(&points, &fit, &img, &format!("E(V) of {}", out.prefix), &out.style)?;
        output::print_success(&format!("EOS plot written to {}", img.display()));
    }

    output::print_done(&format!(
        "V0 = {:.4} Å³, B0 = {:.2} GPa",
        fit.params.v0,
        fit.params.b0_gpa()
    ));
    Ok(())
}

/// 按输入类型收集 E-V 点
fn collect_points(args: &EosArgs, ctx: &Context) -> Result<Vec<EnergyPoint>> {
    let input = &args.input;
    if input.is_dir() {
        return collect_outcars(args, ctx);
    }
    if !input.exists() {
        return Err(MdlabError::FileNotFound {
            path: input.display().to_string(),
        });
    }

    let is_csv = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        return tables::read_energy_csv(input);
    }

    let label = input
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("log");
    lammps_log::parse_log_file(input)?.energy_points(&args.energy_column, label)
}

/// 目录模式：每个 OUTCAR 一个点
fn collect_outcars(args: &EosArgs, ctx: &Context) -> Result<Vec<EnergyPoint>> {
    let files = FileCollector::new(&args.input)
        .with_pattern(&args.pattern)?
        .recursive(true)
        .collect()?;
    if files.is_empty() {
        return Err(MdlabError::FileNotFound {
            path: format!("{}/**/{}", args.input.display(), args.pattern),
        });
    }
    output::print_info(&format!("Found {} OUTCAR file(s)", files.len()));

    let report = BatchRunner::new(ctx.jobs, "Reading OUTCAR")
        .run(&files, |path| outcar_point(path, args.include_unfinished));

    for (path, reason) in &report.skipped {
        output::print_skip(&format!("{} ({})", path.display(), reason));
    }
    output::print_info(&report.summary());

    Ok(report.done.into_iter().map(|(_, p)| p).collect())
}

/// 单个 OUTCAR → E-V 点；标签取所在目录名
fn outcar_point(path: &Path, include_unfinished: bool) -> Result<Outcome<EnergyPoint>> {
    let mut summary = outcar::parse_outcar(path)?;
    if !summary.is_finished && !include_unfinished {
        return Ok(Outcome::Skipped("calculation not finished".to_string()));
    }

    if summary.energy_sigma0.is_none() && summary.free_energy.is_none() {
        let oszicar = path.with_file_name("OSZICAR");
        if oszicar.exists() {
            log::debug!("Energy of {} taken from {}", path.display(), oszicar.display());
            let steps = oszicar::parse_oszicar_file(&oszicar)?;
            if let Some(last) = steps.last() {
                summary.energy_sigma0 = last.energy_sigma0;
                summary.free_energy = Some(last.free_energy);
            }
        }
    }

    let label = path
        .parent()
        .and_then(|p| p.file_name())
        .and_then(|n| n.to_str())
        .unwrap_or("outcar");
    summary.to_energy_point(label).map(Outcome::Done)
}

/// 换算为每原子的能量与体积
fn per_atom(points: Vec<EnergyPoint>) -> Result<Vec<EnergyPoint>> {
    points
        .into_iter()
        .map(|p| {
            let (Some(v), Some(e)) = (p.volume_per_atom(), p.energy_per_atom()) else {
                return Err(MdlabError::InvalidArgument(format!(
                    "--per-atom needs the atom count of '{}'",
                    p.label
                )));
            };
            Ok(EnergyPoint {
                volume: v,
                energy: e,
                num_atoms: Some(1),
                ..p
            })
        })
        .collect()
}

fn print_summary(points: &[EnergyPoint], fit: &EosFit, per_atom: bool) {
    let mut sorted: Vec<&EnergyPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.volume.total_cmp(&b.volume));
    let rows: Vec<PointRow> = sorted
        .iter()
        .map(|p| PointRow {
            label: p.label.clone(),
            volume: format!("{:.4}", p.volume),
            energy: format!("{:.6}", p.energy),
            residual: format!("{:+.3}", 1000.0 * (p.energy - fit.params.energy(p.volume))),
        })
        .collect();
    output::print_table(&rows);

    let unit = if per_atom { "/atom" } else { "" };
    output::print_kv("E0", &format!("{:.6} eV{}", fit.params.e0, unit));
    output::print_kv("V0", &format!("{:.4} Å³{}", fit.params.v0, unit));
    output::print_kv(
        "B0",
        &format!("{:.2} GPa ({:.5} eV/Å³)", fit.params.b0_gpa(), fit.params.b0),
    );
    output::print_kv("B0'", &format!("{:.3}", fit.params.b0_prime));
    output::print_kv("RMS residual", &format!("{:.3} meV", 1000.0 * fit.rms));

    let v_min = sorted.first().map(|p| p.volume).unwrap_or(fit.params.v0);
    let p_max = fit.params.pressure(v_min) * EV_PER_A3_TO_GPA;
    log::debug!("Pressure at the smallest volume: {:.2} GPa", p_max);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_atom() {
        let mut p = EnergyPoint::new("a", 64.0, -16.0);
        p.num_atoms = Some(4);
        let scaled = per_atom(vec![p]).unwrap();
        assert_eq!(scaled[0].volume, 16.0);
        assert_eq!(scaled[0].energy, -4.0);
        assert_eq!(scaled[0].label, "a");

        assert!(per_atom(vec![EnergyPoint::new("b", 10.0, -1.0)]).is_err());
    }

    #[test]
    fn test_outcar_point_skips_unfinished() {
        let dir = std::env::temp_dir().join(format!("mdlab_eos_{}", std::process::id()));
        let run = dir.join("V60");
        std::fs::create_dir_all(&run).unwrap();
        let path = run.join("OUTCAR");
        std::fs::write(
            &path,
            "   number of dos      NEDOS =    301   number of ions     NIONS =      4\n\
             \x20 volume of cell :       60.00\n\
             \x20 energy  without entropy=      -14.90  energy(sigma->0) =      -14.95\n",
        )
        .unwrap();

        assert!(matches!(outcar_point(&path, false).unwrap(), Outcome::Skipped(_)));
        match outcar_point(&path, true).unwrap() {
            Outcome::Done(p) => {
                assert_eq!(p.label, "V60");
                assert!((p.volume - 60.0).abs() < 1e-9);
                assert!((p.energy + 14.95).abs() < 1e-9);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        std::fs::remove_dir_all(&dir).ok();
    }
}
