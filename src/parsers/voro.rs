//! # Voro++ 输入/输出
//!
//! ## 格式说明
//! 导入文件（`voro++ ... file`）：
//! ```text
//! # box: 0 40.5 0 40.5 0 40.5          (三斜时附加 xy xz yz)
//! 1 0.0 0.0 0.0
//! 2 2.025 2.025 0.0
//! ```
//!
//! 自定义输出（`voro++ -c "%i %q %v %A"`）：
//! ```text
//! 1 0.0 0.0 0.0 16.6 0 0 0 0 12
//! ```
//! `%A` 为面边数频率表：第 k 个数是 k 条边的面的数目。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `commands/analyze/voronoi.rs` 使用
//! - 使用 `parsers/lammps_data.rs` 的下三角盒子转换

use crate::error::{MdlabError, Result};
use crate::models::Frame;
use crate::parsers::lammps_data::restricted_triclinic;

use std::fs;
use std::path::Path;

const FORMAT: &str = "voro";

/// Voro++ 自定义输出中的一个胞
#[derive(Debug, Clone, PartialEq)]
pub struct VoroRecord {
    pub id: u64,
    pub position: [f64; 3],
    pub volume: f64,
    /// 面边数频率表（下标 = 边数）
    pub face_orders: Vec<usize>,
}

impl VoroRecord {
    /// Voronoi 指数 ⟨n3, n4, n5, n6, n7+⟩
    pub fn index(&self) -> [usize; 5] {
        let mut idx = [0usize; 5];
        for (edges, &count) in self.face_orders.iter().enumerate() {
            match edges {
                0..=2 => {}
                3..=6 => idx[edges - 3] += count,
                _ => idx[4] += count,
            }
        }
        idx
    }
}

/// 生成 Voro++ 导入文件（笛卡尔坐标，盒子写在注释头中）
pub fn to_voro_string(frame: &Frame) -> String {
    let m = restricted_triclinic(&frame.lattice.matrix);
    let mut out = format!("# {}\n", frame.name);
    out.push_str(&format!(
        "# box: 0 {:.10} 0 {:.10} 0 {:.10}",
        m[0][0], m[1][1], m[2][2]
    ));
    if !frame.lattice.is_orthogonal() {
        out.push_str(&format!(" {:.10} {:.10} {:.10}", m[1][0], m[2][0], m[2][1]));
    }
    out.push('\n');

    for (i, atom) in frame.atoms.iter().enumerate() {
        let f = atom.position;
        let x = f[0] * m[0][0] + f[1] * m[1][0] + f[2] * m[2][0];
        let y = f[1] * m[1][1] + f[2] * m[2][1];
        let z = f[2] * m[2][2];
        out.push_str(&format!(
            "{} {:.10} {:.10} {:.10}\n",
            atom.id.unwrap_or(i as u64 + 1),
            x,
            y,
            z
        ));
    }
    out
}

/// 解析 Voro++ 自定义输出文件
pub fn parse_voro_output_file(path: &Path) -> Result<Vec<VoroRecord>> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_voro_output_content(&content, &path.display().to_string())
}

/// 解析 `%i %q %v %A` 格式的输出
pub fn parse_voro_output_content(content: &str, name: &str) -> Result<Vec<VoroRecord>> {
    let mut records = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = trimmed.split_whitespace().collect();
        if parts.len() < 6 {
            return Err(MdlabError::parse(
                FORMAT,
                name,
                format!("Line {}: expected '%i %q %v %A' fields", lineno + 1),
            ));
        }
        let bad = |s: &str| MdlabError::parse(FORMAT, name, format!("Line {}: bad value '{}'", lineno + 1, s));

        let id: u64 = parts[0].parse().map_err(|_| bad(parts[0]))?;
        let mut position = [0.0; 3];
        for (p, s) in position.iter_mut().zip(&parts[1..4]) {
            *p = s.parse().map_err(|_| bad(s))?;
        }
        let volume: f64 = parts[4].parse().map_err(|_| bad(parts[4]))?;
        let face_orders = parts[5..]
            .iter()
            .map(|s| s.parse::<usize>().map_err(|_| bad(s)))
            .collect::<Result<Vec<usize>>>()?;

        records.push(VoroRecord {
            id,
            position,
            volume,
            face_orders,
        });
    }

    if records.is_empty() {
        return Err(MdlabError::parse(FORMAT, name, "No cells found"));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    #[test]
    fn test_write_import_file() {
        let frame = Frame::new(
            "Al",
            Lattice::orthorhombic(4.0, 4.0, 4.0),
            vec![Atom::new("Al", [0.0, 0.0, 0.0]), Atom::new("Al", [0.5, 0.5, 0.0])],
        );
        let text = to_voro_string(&frame);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[1], "# box: 0 4.0000000000 0 4.0000000000 0 4.0000000000");
        assert_eq!(lines[3], "2 2.0000000000 2.0000000000 0.0000000000");
    }

    #[test]
    fn test_parse_output() {
        let content = "1 0 0 0 16.6 0 0 0 0 12\n2 2.0 2.0 0.0 17.1 0 0 0 1 2 8 2 1\n";
        let records = parse_voro_output_content(content, "out.vol").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].index(), [0, 12, 0, 0, 0]);
        assert_eq!(records[1].index(), [1, 2, 8, 2, 1]);
        assert!((records[1].volume - 17.1).abs() < 1e-12);
    }

    #[test]
    fn test_parse_output_bad_line() {
        assert!(parse_voro_output_content("1 0 0\n", "out.vol").is_err());
    }
}
