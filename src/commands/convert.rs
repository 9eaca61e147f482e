//! # convert 命令实现
//!
//! 批量转换结构/轨迹文件格式。
//!
//! ## 功能
//! - 读取任意支持的输入格式（按文件名检测或 `--format` 指定）
//! - 按 `--frames` 或 `--timestep` 选帧，可选 `--wrap` 折回晶胞
//! - XYZ 输出为单个多帧文件；其他格式每帧一个文件
//! - 并行处理，已存在的输出默认跳过
//!
//! ## 依赖关系
//! - 使用 `cli/convert.rs` 定义的参数
//! - 使用 `batch/`, `parsers/`, `models/`
//! - 使用 `utils/output.rs`

use crate::batch::{BatchRunner, FileCollector, Outcome};
use crate::cli::convert::ConvertArgs;
use crate::commands::Context;
use crate::error::{MdlabError, Result};
use crate::models::{Frame, FrameSelection};
use crate::parsers::{self, OutputFormat, ReadOptions};
use crate::utils::output;

use std::fs;
use std::path::{Path, PathBuf};

/// 执行 convert 命令
pub fn execute(args: ConvertArgs, ctx: &Context) -> Result<()> {
    output::print_header(&format!("Converting to {} format", args.target));

    if !args.input.exists() {
        return Err(MdlabError::FileNotFound {
            path: args.input.display().to_string(),
        });
    }

    fs::create_dir_all(&args.output).map_err(|e| MdlabError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    let files = FileCollector::new(&args.input)
        .with_pattern(&args.pattern)?
        .recursive(args.recursive)
        .collect()?;

    if files.is_empty() {
        output::print_warning(&format!(
            "No files matched '{}' under {}",
            args.pattern,
            args.input.display()
        ));
        return Ok(());
    }
    output::print_info(&format!("Found {} file(s) to convert", files.len()));

    let selection = match &args.frames {
        Some(s) => Some(FrameSelection::parse(s)?),
        None => None,
    };
    let options = ReadOptions {
        format: args.format,
        elements: ctx.elements(&args.elements),
    };

    let report = BatchRunner::new(ctx.jobs, "Converting").run(&files, |path| {
        convert_file(path, &args, &options, selection.as_ref())
    });

    for (input, outputs) in &report.done {
        for out in outputs {
            output::print_conversion(input, out);
        }
    }
    for (input, reason) in &report.skipped {
        output::print_skip(&format!("{} ({})", input.display(), reason));
    }

    output::print_done(&format!(
        "Converted to '{}' in '{}': {}",
        args.target,
        args.output.display(),
        report.summary()
    ));

    Ok(())
}

/// 输出文件名主干：去掉已知扩展名，其余 '.' 换成 '_'
pub fn output_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("structure");
    let known = [".vasp", ".dump", ".lammpstrj", ".cfg", ".rmc", ".xyz", ".extxyz"];
    let base = known
        .iter()
        .find_map(|ext| name.strip_suffix(ext))
        .unwrap_or(name);
    base.replace('.', "_")
}

/// 转换单个文件，返回写出的文件列表
fn convert_file(
    path: &Path,
    args: &ConvertArgs,
    options: &ReadOptions,
    selection: Option<&FrameSelection>,
) -> Result<Outcome<Vec<PathBuf>>> {
    let mut trajectory = parsers::read_trajectory(path, options)?;
    if args.wrap {
        trajectory.frames.iter_mut().for_each(Frame::wrap);
    }

    let frames: Vec<&Frame> = match (args.timestep, selection) {
        (Some(step), _) => vec![trajectory.frame_at_timestep(step)?],
        (None, Some(sel)) => trajectory.select(sel)?,
        (None, None) => trajectory.frames.iter().collect(),
    };

    let stem = output_stem(path);
    let jobs = plan_outputs(&stem, &frames, args.target, &args.output);

    if !args.overwrite && jobs.iter().all(|(p, _)| p.exists()) {
        return Ok(Outcome::Skipped("output exists, use --overwrite".to_string()));
    }

    let mut written = Vec::with_capacity(jobs.len());
    for (out, content) in jobs {
        fs::write(&out, content).map_err(|e| MdlabError::FileWriteError {
            path: out.display().to_string(),
            source: e,
        })?;
        written.push(out);
    }
    Ok(Outcome::Done(written))
}

/// 每个输出文件的路径与内容
fn plan_outputs(
    stem: &str,
    frames: &[&Frame],
    target: OutputFormat,
    dir: &Path,
) -> Vec<(PathBuf, String)> {
    if target.is_multi_frame() || frames.len() == 1 {
        let content: String = frames
            .iter()
            .map(|f| parsers::frame_to_string(f, target))
            .collect();
        return vec![(dir.join(target.file_name(stem)), content)];
    }

    frames
        .iter()
        .enumerate()
        .map(|(k, f)| {
            let tag = match f.timestep {
                Some(step) => format!("{}_{}", stem, step),
                None => format!("{}_{:04}", stem, k + 1),
            };
            (
                dir.join(target.file_name(&tag)),
                parsers::frame_to_string(f, target),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fcc;

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("run/melt.lammpstrj")), "melt");
        assert_eq!(output_stem(Path::new("dump.melt")), "dump_melt");
        assert_eq!(output_stem(Path::new("POSCAR")), "POSCAR");
        assert_eq!(output_stem(Path::new("Al.vasp")), "Al");
    }

    #[test]
    fn test_plan_outputs() {
        let mut a = fcc(4.05, 1, "Al");
        let mut b = a.clone();
        a.timestep = Some(0);
        b.timestep = Some(100);
        let dir = Path::new("out");

        let per_frame = plan_outputs("melt", &[&a, &b], OutputFormat::Poscar, dir);
        let names: Vec<PathBuf> = per_frame.into_iter().map(|(p, _)| p).collect();
        assert_eq!(names, vec![dir.join("POSCAR_melt_0"), dir.join("POSCAR_melt_100")]);

        let xyz = plan_outputs("melt", &[&a, &b], OutputFormat::Xyz, dir);
        assert_eq!(xyz.len(), 1);
        assert_eq!(xyz[0].0, dir.join("melt.xyz"));
        assert_eq!(xyz[0].1.lines().filter(|l| l.trim() == "4").count(), 2);

        let single = plan_outputs("melt", &[&a], OutputFormat::Data, dir);
        assert_eq!(single[0].0, dir.join("melt.data"));
    }

    #[test]
    fn test_convert_file_skips_existing() {
        let dir = std::env::temp_dir().join(format!("mdlab_convert_{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let input = dir.join("POSCAR");
        fs::write(&input, parsers::poscar::to_poscar_string(&fcc(4.05, 1, "Al"))).unwrap();

        let args = ConvertArgs {
            input: input.clone(),
            output: dir.clone(),
            target: OutputFormat::Xyz,
            format: None,
            elements: Vec::new(),
            frames: None,
            timestep: None,
            wrap: false,
            recursive: false,
            pattern: "*".to_string(),
            overwrite: false,
        };
        let options = ReadOptions::default();

        let first = convert_file(&input, &args, &options, None).unwrap();
        assert!(matches!(first, Outcome::Done(ref files) if files == &vec![dir.join("POSCAR.xyz")]));
        let second = convert_file(&input, &args, &options, None).unwrap();
        assert!(matches!(second, Outcome::Skipped(_)));

        fs::remove_dir_all(&dir).ok();
    }
}
