//! # RMC++ 构型文件（v3 格式）
//!
//! ## 格式说明
//! ```text
//! (Version 3 format configuration file)
//! comment
//!
//!          0         0         0 moves generated, tried, accepted
//!          0                     configurations saved
//!
//!       4000 molecules (of all types)
//!          2 types of molecules
//!          1 is the largest number of atoms in a molecule
//!          0 Euler angles are provided
//!
//!           F (Box is not truncated octahedral)
//!             Defining vectors are:
//!              20.000000  0.000000  0.000000        (半盒矢量, Å)
//!               0.000000 20.000000  0.000000
//!               0.000000  0.000000 20.000000
//!
//!       3000 molecules of type  1
//!          1 atomic sites
//!              0.000000  0.000000  0.000000
//!
//!       1000 molecules of type  2
//!          ...
//!
//!  -0.912345  0.123456  0.345678                      (约化坐标 ∈ [-1, 1])
//! ```
//!
//! 笛卡尔坐标 = Σ coord_i · h_i，h 为半盒矢量；因此分数坐标 = (coord + 1) / 2。
//! 原子按类型顺序分组，类型 1 对应元素列表中的第一个元素。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `parsers/lammps_dump.rs` 的 type → 元素映射

use crate::error::{MdlabError, Result};
use crate::models::{wrap_unit, Atom, Frame, Lattice};
use crate::parsers::lammps_dump::element_for_type;

use std::fs;
use std::path::Path;

const FORMAT: &str = "rmc";

/// 解析 RMC++ 构型文件
pub fn parse_rmc_file(path: &Path, elements: &[String]) -> Result<Frame> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("rmc");
    parse_rmc_content(&content, name, elements)
}

/// 从字符串内容解析 RMC++ 构型
pub fn parse_rmc_content(content: &str, name: &str, elements: &[String]) -> Result<Frame> {
    let lines: Vec<&str> = content.lines().collect();

    let total = lines
        .iter()
        .find(|l| l.contains("molecules (of all types)"))
        .and_then(|l| leading_usize(l))
        .ok_or_else(|| MdlabError::parse(FORMAT, name, "Missing 'molecules (of all types)' line"))?;

    let vec_line = lines
        .iter()
        .position(|l| l.contains("Defining vectors are"))
        .ok_or_else(|| MdlabError::parse(FORMAT, name, "Missing 'Defining vectors are:' line"))?;

    let mut half = [[0.0f64; 3]; 3];
    for (i, row) in half.iter_mut().enumerate() {
        let line = lines
            .get(vec_line + 1 + i)
            .ok_or_else(|| MdlabError::parse(FORMAT, name, "Truncated defining vectors"))?;
        *row = parse_triplet(line)
            .ok_or_else(|| MdlabError::parse(FORMAT, name, format!("Bad vector: {}", line.trim())))?;
    }

    // 每种类型的分子数，按出现顺序
    let type_counts: Vec<usize> = lines
        .iter()
        .filter(|l| l.contains("molecules of type"))
        .filter_map(|l| leading_usize(l))
        .collect();
    if type_counts.iter().sum::<usize>() != total {
        return Err(MdlabError::parse(
            FORMAT,
            name,
            format!(
                "Type counts sum to {}, header declares {}",
                type_counts.iter().sum::<usize>(),
                total
            ),
        ));
    }

    // 坐标位于文件末尾：最后 total 个非空行
    let coord_lines: Vec<&str> = lines
        .iter()
        .rev()
        .filter(|l| !l.trim().is_empty())
        .take(total)
        .copied()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    if coord_lines.len() < total {
        return Err(MdlabError::parse(
            FORMAT,
            name,
            format!("Expected {} coordinates, found {}", total, coord_lines.len()),
        ));
    }

    let box_matrix = [
        [2.0 * half[0][0], 2.0 * half[0][1], 2.0 * half[0][2]],
        [2.0 * half[1][0], 2.0 * half[1][1], 2.0 * half[1][2]],
        [2.0 * half[2][0], 2.0 * half[2][1], 2.0 * half[2][2]],
    ];
    let lattice = Lattice::from_vectors(box_matrix);

    let mut atoms = Vec::with_capacity(total);
    let mut line_iter = coord_lines.iter();
    for (t, &count) in type_counts.iter().enumerate() {
        let element = element_for_type(t + 1, elements)?;
        for _ in 0..count {
            let line = line_iter
                .next()
                .ok_or_else(|| MdlabError::parse(FORMAT, name, "Truncated coordinates"))?;
            let c = parse_triplet(line).ok_or_else(|| {
                MdlabError::parse(FORMAT, name, format!("Bad coordinate: {}", line.trim()))
            })?;
            let frac = [
                wrap_unit((c[0] + 1.0) / 2.0),
                wrap_unit((c[1] + 1.0) / 2.0),
                wrap_unit((c[2] + 1.0) / 2.0),
            ];
            let id = atoms.len() as u64 + 1;
            atoms.push(Atom::new(element.clone(), frac).with_id(id));
        }
    }

    let mut frame = Frame::new(name, lattice, atoms);
    frame.source_format = Some(FORMAT.to_string());
    Ok(frame)
}

/// 生成 RMC++ v3 构型文件内容（类型顺序 = frame.species()）
pub fn to_rmc_string(frame: &Frame) -> String {
    let species = frame.species();
    let counts = frame.species_counts();
    let mut out = String::new();

    out.push_str("(Version 3 format configuration file)\n");
    out.push_str(&format!("{}\n\n", frame.name));
    out.push_str("         0         0         0 moves generated, tried, accepted\n");
    out.push_str("         0                     configurations saved\n\n");
    out.push_str(&format!("{:>10} molecules (of all types)\n", frame.len()));
    out.push_str(&format!("{:>10} types of molecules\n", species.len()));
    out.push_str("         1 is the largest number of atoms in a molecule\n");
    out.push_str("         0 Euler angles are provided\n\n");
    out.push_str("          F (Box is not truncated octahedral)\n");
    out.push_str("            Defining vectors are:\n");
    for row in &frame.lattice.matrix {
        out.push_str(&format!(
            "            {:11.6} {:11.6} {:11.6}\n",
            row[0] / 2.0,
            row[1] / 2.0,
            row[2] / 2.0
        ));
    }
    out.push('\n');

    for (t, (_, n)) in counts.iter().enumerate() {
        out.push_str(&format!("{:>10} molecules of type{:>3}\n", n, t + 1));
        out.push_str("         1 atomic sites\n");
        out.push_str("            0.000000  0.000000  0.000000\n\n");
    }

    for elem in &species {
        for atom in frame.atoms.iter().filter(|a| &a.element == elem) {
            let p = atom.position;
            out.push_str(&format!(
                "{:11.6}{:11.6}{:11.6}\n",
                2.0 * wrap_unit(p[0]) - 1.0,
                2.0 * wrap_unit(p[1]) - 1.0,
                2.0 * wrap_unit(p[2]) - 1.0
            ));
        }
    }

    out
}

fn leading_usize(line: &str) -> Option<usize> {
    line.split_whitespace().next()?.parse().ok()
}

fn parse_triplet(line: &str) -> Option<[f64; 3]> {
    let vals: Vec<f64> = line
        .split_whitespace()
        .take(3)
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if vals.len() < 3 {
        return None;
    }
    Some([vals[0], vals[1], vals[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"(Version 3 format configuration file)
Al90Sm10 test

         0         0         0 moves generated, tried, accepted
         0                     configurations saved

         3 molecules (of all types)
         2 types of molecules
         1 is the largest number of atoms in a molecule
         0 Euler angles are provided

          F (Box is not truncated octahedral)
            Defining vectors are:
             5.000000  0.000000  0.000000
             0.000000  5.000000  0.000000
             0.000000  0.000000  5.000000

         2 molecules of type  1
         1 atomic sites
            0.000000  0.000000  0.000000

         1 molecules of type  2
         1 atomic sites
            0.000000  0.000000  0.000000

  -1.000000  -1.000000  -1.000000
   0.000000   0.000000   0.000000
   0.500000  -0.500000   0.000000
"#;

    #[test]
    fn test_parse_rmc() {
        let elements = vec!["Al".to_string(), "Sm".to_string()];
        let frame = parse_rmc_content(SAMPLE, "test", &elements).unwrap();
        assert_eq!(frame.len(), 3);
        assert!((frame.lattice.volume() - 1000.0).abs() < 1e-9);
        assert_eq!(frame.atoms[0].element, "Al");
        assert_eq!(frame.atoms[2].element, "Sm");
        assert_eq!(frame.atoms[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(frame.atoms[1].position, [0.5, 0.5, 0.5]);
        let cart = frame.cartesian_positions();
        assert!((cart[2][0] - 7.5).abs() < 1e-9);
        assert!((cart[2][1] - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_unnamed_types() {
        let frame = parse_rmc_content(SAMPLE, "test", &[]).unwrap();
        assert_eq!(frame.species(), vec!["Type1".to_string(), "Type2".to_string()]);
    }

    #[test]
    fn test_write_and_read_back() {
        let elements = vec!["Al".to_string(), "Sm".to_string()];
        let frame = parse_rmc_content(SAMPLE, "test", &elements).unwrap();
        let text = to_rmc_string(&frame);
        let again = parse_rmc_content(&text, "test", &elements).unwrap();
        assert_eq!(again.len(), 3);
        assert!((again.lattice.volume() - 1000.0).abs() < 1e-6);
        for (a, b) in frame.atoms.iter().zip(&again.atoms) {
            assert_eq!(a.element, b.element);
            for k in 0..3 {
                assert!((a.position[k] - b.position[k]).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_count_mismatch() {
        let bad = SAMPLE.replace("         3 molecules (of all types)", "         4 molecules (of all types)");
        assert!(parse_rmc_content(&bad, "test", &[]).is_err());
    }
}
