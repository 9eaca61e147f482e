//! # LAMMPS dump 解析器
//!
//! 解析文本格式的 LAMMPS dump 文件（`atom` / `custom` 风格），支持多帧。
//!
//! ## 格式说明
//! ```text
//! ITEM: TIMESTEP
//! 1000
//! ITEM: NUMBER OF ATOMS
//! 4000
//! ITEM: BOX BOUNDS pp pp pp          (三斜盒子: ITEM: BOX BOUNDS xy xz yz pp pp pp)
//! xlo xhi                            (xlo_bound xhi_bound xy)
//! ylo yhi                            (ylo_bound yhi_bound xz)
//! zlo zhi                            (zlo_bound zhi_bound yz)
//! ITEM: ATOMS id type xs ys zs
//! 1 1 0.0 0.0 0.0
//! ...
//! ```
//!
//! 坐标列可以是 `x y z`、`xu yu zu`、`xs ys zs` 或 `xsu ysu zsu`；
//! 元素来自 `element` 列，或由 `type` 列经元素列表映射（type 1 → 第一个元素）。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/`

use crate::error::{MdlabError, Result};
use crate::models::{Atom, Frame, Lattice, Trajectory};

use std::fs;
use std::path::Path;

/// 解析选项
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    /// atom type → 元素名（下标 0 对应 type 1）
    pub elements: Vec<String>,
}

/// 坐标列的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordKind {
    /// 笛卡尔坐标 (x / xu)
    Cartesian,
    /// 约化坐标 (xs / xsu)
    Scaled,
}

/// ATOMS 行的列布局
#[derive(Debug, Clone)]
struct ColumnLayout {
    id: Option<usize>,
    atom_type: Option<usize>,
    element: Option<usize>,
    coords: [usize; 3],
    kind: CoordKind,
    width: usize,
}

impl ColumnLayout {
    fn from_header(header: &str, name: &str) -> Result<Self> {
        // "ITEM: ATOMS id type xs ys zs"
        let cols: Vec<&str> = header
            .trim_start_matches("ITEM:")
            .split_whitespace()
            .skip(1)
            .collect();
        let find = |c: &str| cols.iter().position(|x| *x == c);

        let candidates = [
            (["x", "y", "z"], CoordKind::Cartesian),
            (["xu", "yu", "zu"], CoordKind::Cartesian),
            (["xs", "ys", "zs"], CoordKind::Scaled),
            (["xsu", "ysu", "zsu"], CoordKind::Scaled),
        ];

        let (coords, kind) = candidates
            .iter()
            .find_map(|(names, kind)| {
                match (find(names[0]), find(names[1]), find(names[2])) {
                    (Some(a), Some(b), Some(c)) => Some(([a, b, c], *kind)),
                    _ => None,
                }
            })
            .ok_or_else(|| {
                MdlabError::parse(
                    "lammps-dump",
                    name,
                    format!("No coordinate columns in '{}'", header.trim()),
                )
            })?;

        let atom_type = find("type");
        let element = find("element");
        if atom_type.is_none() && element.is_none() {
            return Err(MdlabError::parse(
                "lammps-dump",
                name,
                "ATOMS section has neither 'type' nor 'element' column",
            ));
        }

        Ok(ColumnLayout {
            id: find("id"),
            atom_type,
            element,
            coords,
            kind,
            width: cols.len(),
        })
    }
}

/// 盒子：晶格 + 原点
#[derive(Debug, Clone, Copy)]
struct DumpBox {
    lattice: Lattice,
    origin: [f64; 3],
}

/// 解析 dump 文件的所有帧
pub fn parse_dump_file(path: &Path, options: &DumpOptions) -> Result<Trajectory> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dump");
    parse_dump_content(&content, name, options)
}

/// 只解析第一帧
pub fn read_first_snapshot(path: &Path, options: &DumpOptions) -> Result<Frame> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dump");
    let lines: Vec<&str> = content.lines().collect();
    let (frame, _) = parse_snapshot(&lines, 0, name, options)?;
    Ok(frame)
}

/// 统计快照数（不解析坐标）
pub fn count_snapshots(content: &str) -> usize {
    content
        .lines()
        .filter(|l| l.starts_with("ITEM: TIMESTEP"))
        .count()
}

/// 从字符串内容解析所有帧
pub fn parse_dump_content(content: &str, name: &str, options: &DumpOptions) -> Result<Trajectory> {
    let lines: Vec<&str> = content.lines().collect();
    let mut frames = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        if lines[idx].trim().is_empty() {
            idx += 1;
            continue;
        }
        let (frame, next) = parse_snapshot(&lines, idx, name, options)?;
        frames.push(frame);
        idx = next;
    }

    if frames.is_empty() {
        return Err(MdlabError::parse("lammps-dump", name, "No snapshots found"));
    }

    let trajectory = Trajectory::new(frames);
    trajectory.check_consistent()?;

    log::debug!(
        "dump '{}': {} snapshots, {} atoms",
        name,
        trajectory.len(),
        trajectory.first().map(|f| f.len()).unwrap_or(0)
    );

    Ok(trajectory)
}

/// 解析从 `start` 开始的一个快照，返回帧与下一个快照的起始行
fn parse_snapshot(
    lines: &[&str],
    start: usize,
    name: &str,
    options: &DumpOptions,
) -> Result<(Frame, usize)> {
    let err = |reason: String| MdlabError::parse("lammps-dump", name, reason);
    let line_at = |i: usize| -> Result<&str> {
        lines
            .get(i)
            .copied()
            .ok_or_else(|| err(format!("Unexpected end of file at line {}", i + 1)))
    };

    let mut idx = start;
    let mut timestep: Option<u64> = None;
    let mut natoms: Option<usize> = None;
    let mut dump_box: Option<DumpBox> = None;

    loop {
        let line = line_at(idx)?;
        if line.starts_with("ITEM: TIMESTEP") {
            timestep = Some(
                line_at(idx + 1)?
                    .trim()
                    .parse()
                    .map_err(|_| err(format!("Invalid timestep at line {}", idx + 2)))?,
            );
            idx += 2;
        } else if line.starts_with("ITEM: NUMBER OF ATOMS") {
            natoms = Some(
                line_at(idx + 1)?
                    .trim()
                    .parse()
                    .map_err(|_| err(format!("Invalid atom count at line {}", idx + 2)))?,
            );
            idx += 2;
        } else if line.starts_with("ITEM: BOX BOUNDS") {
            let rows = [line_at(idx + 1)?, line_at(idx + 2)?, line_at(idx + 3)?];
            dump_box = Some(parse_box(line, &rows).map_err(|r| err(r))?);
            idx += 4;
        } else if line.starts_with("ITEM: ATOMS") {
            break;
        } else if line.starts_with("ITEM:") {
            // 未知 ITEM（UNITS, TIME 或自定义多行段）：跳到下一个 ITEM
            idx += 1;
            while !line_at(idx)?.starts_with("ITEM:") {
                idx += 1;
            }
        } else {
            return Err(err(format!(
                "Unexpected line {}: '{}'",
                idx + 1,
                line.trim()
            )));
        }
    }

    let natoms = natoms.ok_or_else(|| err("Missing 'ITEM: NUMBER OF ATOMS'".to_string()))?;
    let dump_box = dump_box.ok_or_else(|| err("Missing 'ITEM: BOX BOUNDS'".to_string()))?;
    let layout = ColumnLayout::from_header(lines[idx], name)?;
    idx += 1;

    let mut atoms: Vec<Atom> = Vec::with_capacity(natoms);
    for k in 0..natoms {
        let line = line_at(idx + k).map_err(|_| {
            err(format!(
                "Snapshot at timestep {:?} has {} of {} atoms",
                timestep, k, natoms
            ))
        })?;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < layout.width {
            return Err(err(format!(
                "Expected {} columns at line {}, found {}",
                layout.width,
                idx + k + 1,
                fields.len()
            )));
        }

        let mut xyz = [0.0; 3];
        for (d, &col) in layout.coords.iter().enumerate() {
            xyz[d] = fields[col]
                .parse()
                .map_err(|_| err(format!("Invalid coordinate at line {}", idx + k + 1)))?;
        }

        let position = match layout.kind {
            CoordKind::Scaled => xyz,
            CoordKind::Cartesian => dump_box.lattice.to_fractional([
                xyz[0] - dump_box.origin[0],
                xyz[1] - dump_box.origin[1],
                xyz[2] - dump_box.origin[2],
            ]),
        };

        let element = match layout.element {
            Some(col) => fields[col].to_string(),
            None => {
                let col = layout.atom_type.unwrap_or(0);
                let t: usize = fields[col]
                    .parse()
                    .map_err(|_| err(format!("Invalid atom type at line {}", idx + k + 1)))?;
                element_for_type(t, &options.elements)?
            }
        };

        let mut atom = Atom::new(element, position);
        if let Some(col) = layout.id {
            atom.id = fields[col].parse().ok();
        }
        atoms.push(atom);
    }

    // 按 id 排序，保证帧间原子顺序一致
    if layout.id.is_some() {
        atoms.sort_by_key(|a| a.id.unwrap_or(u64::MAX));
    }

    let mut frame = Frame::new(name, dump_box.lattice, atoms);
    frame.timestep = timestep;
    frame.source_format = Some("lammps-dump".to_string());

    Ok((frame, idx + natoms))
}

/// type → 元素。未提供元素列表时用 "Type<N>" 作为名字
pub(crate) fn element_for_type(t: usize, elements: &[String]) -> Result<String> {
    if t == 0 {
        return Err(MdlabError::UnknownAtomType {
            atom_type: t,
            known: elements.len(),
        });
    }
    if elements.is_empty() {
        return Ok(format!("Type{}", t));
    }
    elements
        .get(t - 1)
        .cloned()
        .ok_or(MdlabError::UnknownAtomType {
            atom_type: t,
            known: elements.len(),
        })
}

/// 解析 BOX BOUNDS（正交与三斜）
fn parse_box(header: &str, rows: &[&str; 3]) -> std::result::Result<DumpBox, String> {
    let triclinic = header.contains("xy");

    let mut vals = [[0.0f64; 3]; 3];
    for (i, row) in rows.iter().enumerate() {
        let parts: Vec<f64> = row
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        let need = if triclinic { 3 } else { 2 };
        if parts.len() < need {
            return Err(format!("Invalid box bounds line: '{}'", row.trim()));
        }
        vals[i][0] = parts[0];
        vals[i][1] = parts[1];
        if triclinic {
            vals[i][2] = parts[2];
        }
    }

    let (xy, xz, yz) = if triclinic {
        (vals[0][2], vals[1][2], vals[2][2])
    } else {
        (0.0, 0.0, 0.0)
    };

    // 三斜盒子给出的是包围盒，需要扣除倾斜量
    let xlo = vals[0][0] - [0.0, xy, xz, xy + xz].iter().cloned().fold(f64::INFINITY, f64::min);
    let xhi = vals[0][1] - [0.0, xy, xz, xy + xz].iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let ylo = vals[1][0] - 0.0f64.min(yz);
    let yhi = vals[1][1] - 0.0f64.max(yz);
    let zlo = vals[2][0];
    let zhi = vals[2][1];

    let lattice = Lattice::from_vectors([
        [xhi - xlo, 0.0, 0.0],
        [xy, yhi - ylo, 0.0],
        [xz, yz, zhi - zlo],
    ]);

    if lattice.volume() <= 0.0 {
        return Err("Box has non-positive volume".to_string());
    }

    Ok(DumpBox {
        lattice,
        origin: [xlo, ylo, zlo],
    })
}
