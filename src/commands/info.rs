//! # info 命令实现
//!
//! 汇总结构、轨迹与计算输出文件的基本信息。
//!
//! ## 支持的文件
//! - 结构/轨迹：帧数、原子数、化学式、晶格参数、体积、数密度、时间步范围
//! - OUTCAR：是否完成、能量、体积、压力、离子步数
//! - OSZICAR：离子步数与最终能量
//! - LAMMPS log：run 命令与 thermo 块
//!
//! ## 依赖关系
//! - 使用 `cli/info.rs` 定义的参数
//! - 使用 `batch/`, `parsers/`
//! - 使用 `tabled` 输出表格，`serde_json` 输出 JSON

use crate::batch::{BatchRunner, FileCollector, Outcome};
use crate::cli::info::InfoArgs;
use crate::commands::Context;
use crate::error::{MdlabError, Result};
use crate::parsers::{
    self, lammps_dump, lammps_log, oszicar, outcar, InputFormat, ReadOptions,
};
use crate::utils::output;

use serde::Serialize;
use std::fs;
use std::path::Path;
use tabled::Tabled;

/// 单个文件的信息
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum FileInfo {
    Structure {
        format: String,
        frames: usize,
        atoms: usize,
        formula: String,
        /// a, b, c (Å), alpha, beta, gamma (°)
        lattice: [f64; 6],
        volume: f64,
        /// 原子数密度 (Å⁻³)，多帧时取平均
        density: f64,
        first_timestep: Option<u64>,
        last_timestep: Option<u64>,
    },
    Outcar {
        finished: bool,
        energy: Option<f64>,
        volume: Option<f64>,
        pressure: Option<f64>,
        atoms: Option<usize>,
        ionic_steps: usize,
    },
    Oszicar {
        steps: usize,
        free_energy: Option<f64>,
        energy_sigma0: Option<f64>,
    },
    LammpsLog {
        runs: Vec<u64>,
        blocks: usize,
        columns: Vec<String>,
    },
}

impl FileInfo {
    fn kind(&self) -> String {
        match self {
            FileInfo::Structure { format, .. } => format.clone(),
            FileInfo::Outcar { .. } => "outcar".to_string(),
            FileInfo::Oszicar { .. } => "oszicar".to_string(),
            FileInfo::LammpsLog { .. } => "lammps-log".to_string(),
        }
    }

    fn atoms(&self) -> String {
        match self {
            FileInfo::Structure { atoms, .. } => atoms.to_string(),
            FileInfo::Outcar { atoms: Some(n), .. } => n.to_string(),
            _ => "-".to_string(),
        }
    }

    fn details(&self) -> String {
        match self {
            FileInfo::Structure {
                frames,
                formula,
                lattice,
                volume,
                density,
                first_timestep,
                last_timestep,
                ..
            } => {
                let mut s = format!(
                    "{} | {} frame(s) | a={:.3} b={:.3} c={:.3} α={:.1} β={:.1} γ={:.1} | V={:.2} Å³ | ρ={:.5} Å⁻³",
                    formula, frames, lattice[0], lattice[1], lattice[2], lattice[3], lattice[4], lattice[5],
                    volume, density
                );
                if let (Some(a), Some(b)) = (first_timestep, last_timestep) {
                    s.push_str(&format!(" | steps {}..{}", a, b));
                }
                s
            }
            FileInfo::Outcar {
                finished,
                energy,
                volume,
                pressure,
                ionic_steps,
                ..
            } => format!(
                "{} | E={} eV | V={} Å³ | P={} kBar | {} ionic step(s)",
                if *finished { "finished" } else { "UNFINISHED" },
                fmt_opt(*energy, 6),
                fmt_opt(*volume, 3),
                fmt_opt(*pressure, 2),
                ionic_steps
            ),
            FileInfo::Oszicar {
                steps,
                free_energy,
                energy_sigma0,
            } => format!(
                "{} step(s) | F={} eV | E0={} eV",
                steps,
                fmt_opt(*free_energy, 6),
                fmt_opt(*energy_sigma0, 6)
            ),
            FileInfo::LammpsLog { runs, blocks, columns } => format!(
                "{} run(s), {} step(s) | {} thermo block(s) | {}",
                runs.len(),
                runs.iter().sum::<u64>(),
                blocks,
                columns.join(" ")
            ),
        }
    }
}

fn fmt_opt(value: Option<f64>, digits: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", digits, v),
        None => "-".to_string(),
    }
}

#[derive(Tabled)]
struct InfoRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Atoms")]
    atoms: String,
    #[tabled(rename = "Summary")]
    details: String,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    file: String,
    #[serde(flatten)]
    info: &'a FileInfo,
}

/// 执行 info 命令
pub fn execute(args: InfoArgs, ctx: &Context) -> Result<()> {
    let files = FileCollector::new(&args.input)
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect()?;

    let options = ReadOptions {
        format: args.format,
        elements: ctx.elements(&args.elements),
    };

    let mut runner = BatchRunner::new(ctx.jobs, "Reading");
    if args.json || files.len() == 1 {
        runner = runner.quiet();
    }
    let report = runner.run(&files, |path| inspect_file(path, &options));

    if args.json {
        let entries: Vec<JsonEntry> = report
            .done
            .iter()
            .map(|(path, info)| JsonEntry {
                file: path.display().to_string(),
                info,
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| MdlabError::Other(format!("JSON serialization failed: {}", e)))?;
        println!("{}", json);
        return Ok(());
    }

    output::print_header("File information");
    let rows: Vec<InfoRow> = report
        .done
        .iter()
        .map(|(path, info)| InfoRow {
            file: path.display().to_string(),
            kind: info.kind(),
            atoms: info.atoms(),
            details: info.details(),
        })
        .collect();
    if !rows.is_empty() {
        output::print_table(&rows);
    }
    for (path, reason) in &report.skipped {
        output::print_skip(&format!("{} ({})", path.display(), reason));
    }
    output::print_separator();
    output::print_done(&report.summary());

    Ok(())
}

/// 按文件名识别类型并读取信息
pub fn inspect_file(path: &Path, options: &ReadOptions) -> Result<Outcome<FileInfo>> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let upper = name.to_uppercase();

    if upper.starts_with("OUTCAR") {
        let s = outcar::parse_outcar(path)?;
        return Ok(Outcome::Done(FileInfo::Outcar {
            finished: s.is_finished,
            energy: s.energy_sigma0.or(s.free_energy),
            volume: s.volume,
            pressure: s.pressure,
            atoms: s.num_atoms,
            ionic_steps: s.ionic_steps,
        }));
    }
    if upper.starts_with("OSZICAR") {
        let steps = oszicar::parse_oszicar_file(path)?;
        let last = steps.last();
        return Ok(Outcome::Done(FileInfo::Oszicar {
            steps: steps.len(),
            free_energy: last.map(|s| s.free_energy),
            energy_sigma0: last.and_then(|s| s.energy_sigma0),
        }));
    }
    if name == "log.lammps" || name.ends_with(".log") {
        let log = lammps_log::parse_log_file(path)?;
        let columns = log
            .blocks
            .last()
            .map(|b| b.columns.clone())
            .unwrap_or_default();
        return Ok(Outcome::Done(FileInfo::LammpsLog {
            runs: log.runs,
            blocks: log.blocks.len(),
            columns,
        }));
    }

    let format = match options.format.or_else(|| parsers::detect_format(path)) {
        Some(f) => f,
        None => return Ok(Outcome::Skipped("unrecognized file type".to_string())),
    };

    // dump 只解析首帧，其余仅计数
    let (first, frames, last_timestep, density) = if format == InputFormat::Dump {
        let dump_opts = lammps_dump::DumpOptions {
            elements: options.elements.clone(),
        };
        let frame = lammps_dump::read_first_snapshot(path, &dump_opts)?;
        let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let lines: Vec<&str> = content.lines().collect();
        let last = lines
            .windows(2)
            .rev()
            .find(|w| w[0].starts_with("ITEM: TIMESTEP"))
            .and_then(|w| w[1].trim().parse::<u64>().ok());
        let density = frame.number_density();
        (frame, lammps_dump::count_snapshots(&content), last, density)
    } else {
        let opts = ReadOptions {
            format: Some(format),
            elements: options.elements.clone(),
        };
        let trajectory = parsers::read_trajectory(path, &opts)?;
        let frames = trajectory.len();
        let last = trajectory.last().and_then(|f| f.timestep);
        let density = trajectory.mean_number_density();
        let first = trajectory
            .frames
            .into_iter()
            .next()
            .ok_or_else(|| MdlabError::parse(&format.to_string(), name, "No frames found"))?;
        (first, frames, last, density)
    };

    let (a, b, c, alpha, beta, gamma) = first.lattice.parameters();
    Ok(Outcome::Done(FileInfo::Structure {
        format: format.to_string(),
        frames,
        atoms: first.len(),
        formula: first.formula(),
        lattice: [a, b, c, alpha, beta, gamma],
        volume: first.lattice.volume(),
        density,
        first_timestep: first.timestep,
        last_timestep,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fcc;

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("mdlab_info_{}_{}", tag, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_inspect_poscar() {
        let dir = temp_dir("poscar");
        let path = dir.join("POSCAR");
        fs::write(&path, parsers::poscar::to_poscar_string(&fcc(4.0, 2, "Al"))).unwrap();

        let outcome = inspect_file(&path, &ReadOptions::default()).unwrap();
        match outcome {
            Outcome::Done(FileInfo::Structure { frames, atoms, formula, volume, density, .. }) => {
                assert_eq!(frames, 1);
                assert_eq!(atoms, 32);
                assert_eq!(formula, "Al32");
                assert!((volume - 512.0).abs() < 1e-6);
                assert!((density - 32.0 / 512.0).abs() < 1e-9);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_inspect_oszicar_and_unknown() {
        let dir = temp_dir("oszicar");
        let osz = dir.join("OSZICAR");
        fs::write(
            &osz,
            "   1 F= -.14900000E+02 E0= -.14890000E+02  d E =-.149000E+02\n\
             \x20  2 F= -.15000000E+02 E0= -.14990000E+02  d E =-.100000E+00\n",
        )
        .unwrap();
        match inspect_file(&osz, &ReadOptions::default()).unwrap() {
            Outcome::Done(FileInfo::Oszicar { steps, free_energy, energy_sigma0 }) => {
                assert_eq!(steps, 2);
                assert!((free_energy.unwrap() + 15.0).abs() < 1e-9);
                assert!((energy_sigma0.unwrap() + 14.99).abs() < 1e-9);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        let notes = dir.join("notes.txt");
        fs::write(&notes, "hello").unwrap();
        assert!(matches!(
            inspect_file(&notes, &ReadOptions::default()).unwrap(),
            Outcome::Skipped(_)
        ));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_json_tagging() {
        let info = FileInfo::Oszicar {
            steps: 3,
            free_energy: Some(-1.0),
            energy_sigma0: None,
        };
        let entry = JsonEntry {
            file: "OSZICAR".to_string(),
            info: &info,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["kind"], "oszicar");
        assert_eq!(json["file"], "OSZICAR");
        assert_eq!(json["steps"], 3);
    }
}
