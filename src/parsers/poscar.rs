//! # VASP POSCAR 格式解析器
//!
//! 解析 VASP POSCAR/CONTCAR 文件格式。
//!
//! ## POSCAR 格式说明
//! ```text
//! Comment line (structure name)
//! 1.0                    # scaling factor (negative = target volume)
//! a1 a2 a3               # lattice vector a
//! b1 b2 b3               # lattice vector b
//! c1 c2 c3               # lattice vector c
//! Element1 Element2 ...  # element symbols (VASP 5+)
//! n1 n2 ...              # number of atoms per element
//! Selective dynamics     # optional
//! Direct/Cartesian       # coordinate type
//! x1 y1 z1               # atom positions
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `parsers/xdatcar.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{MdlabError, Result};
use crate::models::{Atom, Frame, Lattice};
use std::fs;
use std::path::Path;

/// POSCAR 头部（XDATCAR 共用同样的头部）
#[derive(Debug, Clone)]
pub(crate) struct PoscarHeader {
    pub name: String,
    pub lattice: Lattice,
    pub elements: Vec<String>,
    pub counts: Vec<usize>,
    /// 实际作用于晶格的缩放因子（笛卡尔坐标同样需要乘）
    pub scale: f64,
    /// 头部之后第一行的下标
    pub next_line: usize,
}

impl PoscarHeader {
    pub fn total_atoms(&self) -> usize {
        self.counts.iter().sum()
    }

    /// 按计数展开的元素序列
    pub fn element_sequence(&self) -> Vec<String> {
        self.elements
            .iter()
            .zip(self.counts.iter())
            .flat_map(|(e, &n)| std::iter::repeat(e.clone()).take(n))
            .collect()
    }
}

/// 解析 POSCAR/CONTCAR 文件
pub fn parse_poscar_file(path: &Path) -> Result<Frame> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_poscar_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 POSCAR 格式
pub fn parse_poscar_content(content: &str, default_name: &str) -> Result<Frame> {
    let lines: Vec<&str> = content.lines().collect();
    let header = parse_header(&lines, 0, default_name, "poscar")?;
    let name = header.name.clone();

    // Check for "Selective dynamics" line
    let mut coord_line = header.next_line;
    if lines.len() > coord_line
        && lines[coord_line]
            .trim()
            .to_lowercase()
            .starts_with('s')
    {
        coord_line += 1;
    }

    // Coordinate type line
    if lines.len() <= coord_line {
        return Err(MdlabError::parse(
            "poscar",
            &name,
            "Missing coordinate type line",
        ));
    }

    let coord_type = lines[coord_line].trim().to_lowercase();
    let is_cartesian = coord_type.starts_with('c') || coord_type.starts_with('k');
    let scale = header.scale;

    let positions = read_positions(&lines, coord_line + 1, header.total_atoms(), &name, "poscar")?;

    let atoms: Vec<Atom> = header
        .element_sequence()
        .into_iter()
        .zip(positions)
        .map(|(elem, p)| {
            let position = if is_cartesian {
                header
                    .lattice
                    .to_fractional([p[0] * scale, p[1] * scale, p[2] * scale])
            } else {
                p
            };
            Atom::new(elem, position)
        })
        .collect();

    let mut frame = Frame::new(name, header.lattice, atoms);
    frame.source_format = Some("poscar".to_string());

    Ok(frame)
}

/// 解析从 `start` 行开始的 POSCAR 头部（名称、缩放、晶格、元素、计数）
pub(crate) fn parse_header(
    lines: &[&str],
    start: usize,
    default_name: &str,
    format: &str,
) -> Result<PoscarHeader> {
    if lines.len() < start + 7 {
        return Err(MdlabError::parse(format, default_name, "File too short"));
    }

    // Line 0: Comment/name
    let name = lines[start].trim().to_string();
    let name = if name.is_empty() {
        default_name.to_string()
    } else {
        name
    };

    // Line 1: Scaling factor
    let scale: f64 = lines[start + 1]
        .split_whitespace()
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| MdlabError::parse(format, &name, "Invalid scaling factor"))?;

    // Lines 2-4: Lattice vectors
    let mut matrix = [[0.0; 3]; 3];
    for (i, row) in matrix.iter_mut().enumerate() {
        let parts: Vec<f64> = lines[start + 2 + i]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(MdlabError::parse(
                format,
                &name,
                format!("Invalid lattice vector at line {}", start + 3 + i),
            ));
        }
        *row = [parts[0], parts[1], parts[2]];
    }

    // 负缩放因子表示目标体积
    let factor = if scale < 0.0 {
        let v = Lattice::from_vectors(matrix).volume().abs();
        if v < 1e-10 {
            return Err(MdlabError::SingularLattice(v));
        }
        (scale.abs() / v).cbrt()
    } else {
        scale
    };
    for row in matrix.iter_mut() {
        for x in row.iter_mut() {
            *x *= factor;
        }
    }
    let lattice = Lattice::from_vectors(matrix);

    // Line 5: Element symbols (VASP 5+) or atom counts (VASP 4)
    let line5_parts: Vec<&str> = lines[start + 5].split_whitespace().collect();
    if line5_parts.is_empty() {
        return Err(MdlabError::parse(format, &name, "Missing element/count line"));
    }

    let (elements, counts, next_line) = if line5_parts[0].parse::<usize>().is_ok() {
        // VASP 4 format: no element line, only counts
        let counts: Vec<usize> = line5_parts.iter().filter_map(|s| s.parse().ok()).collect();
        let elements: Vec<String> = (0..counts.len()).map(|i| format!("X{}", i + 1)).collect();
        (elements, counts, start + 6)
    } else {
        // VASP 5+ format: element symbols on line 5, counts on line 6
        // POTCAR 风格的 "Fe_pv" 或 "Fe/xxxx" 只保留元素符号
        let elements: Vec<String> = line5_parts
            .iter()
            .map(|s| {
                s.split(['_', '/'])
                    .next()
                    .unwrap_or(s)
                    .to_string()
            })
            .collect();
        let counts: Vec<usize> = lines[start + 6]
            .split_whitespace()
            .filter_map(|s| s.parse().ok())
            .collect();
        (elements, counts, start + 7)
    };

    if counts.len() != elements.len() || counts.is_empty() {
        return Err(MdlabError::parse(
            format,
            &name,
            format!(
                "{} element symbol(s) but {} count(s)",
                elements.len(),
                counts.len()
            ),
        ));
    }

    Ok(PoscarHeader {
        name,
        lattice,
        elements,
        counts,
        scale: factor,
        next_line,
    })
}

/// 读取 n 行坐标
pub(crate) fn read_positions(
    lines: &[&str],
    start: usize,
    n: usize,
    name: &str,
    format: &str,
) -> Result<Vec<[f64; 3]>> {
    let mut positions = Vec::with_capacity(n);
    for k in 0..n {
        let line = lines.get(start + k).ok_or_else(|| {
            MdlabError::parse(
                format,
                name,
                format!("Expected {} positions, found {}", n, k),
            )
        })?;
        let parts: Vec<f64> = line
            .split_whitespace()
            .take(3)
            .filter_map(|s| s.parse().ok())
            .collect();
        if parts.len() < 3 {
            return Err(MdlabError::parse(
                format,
                name,
                format!("Invalid position at line {}", start + k + 1),
            ));
        }
        positions.push([parts[0], parts[1], parts[2]]);
    }
    Ok(positions)
}

/// 将 Frame 转换为 POSCAR 格式字符串
pub fn to_poscar_string(frame: &Frame) -> String {
    let species = frame.species();
    let mut result = String::new();

    result.push_str(&format!("{}\n", frame.name));
    result.push_str("1.0\n");

    for row in &frame.lattice.matrix {
        result.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    result.push_str(&format!("   {}\n", species.join("   ")));

    let counts: Vec<String> = frame
        .species_counts()
        .iter()
        .map(|(_, n)| n.to_string())
        .collect();
    result.push_str(&format!("   {}\n", counts.join("   ")));

    result.push_str("Direct\n");

    // 按元素分组输出
    for elem in &species {
        for atom in frame.atoms.iter().filter(|a| &a.element == elem) {
            let p = atom.position;
            result.push_str(&format!(
                "  {:16.10}  {:16.10}  {:16.10}\n",
                p[0], p[1], p[2]
            ));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_poscar_vasp5() {
        let content = r#"NaCl
1.0
5.64 0.0 0.0
0.0 5.64 0.0
0.0 0.0 5.64
Na Cl
4 4
Direct
0.0 0.0 0.0
0.5 0.5 0.0
0.5 0.0 0.5
0.0 0.5 0.5
0.5 0.0 0.0
0.0 0.5 0.0
0.0 0.0 0.5
0.5 0.5 0.5
"#;
        let frame = parse_poscar_content(content, "NaCl").unwrap();
        assert_eq!(frame.name, "NaCl");
        assert_eq!(frame.atoms.len(), 8);

        let na_count = frame.atoms.iter().filter(|a| a.element == "Na").count();
        let cl_count = frame.atoms.iter().filter(|a| a.element == "Cl").count();
        assert_eq!(na_count, 4);
        assert_eq!(cl_count, 4);
    }

    #[test]
    fn test_parse_poscar_with_scale() {
        let content = r#"Si
2.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Si
2
Direct
0.0 0.0 0.0
0.5 0.5 0.5
"#;
        let frame = parse_poscar_content(content, "Si").unwrap();
        let (a, _, _, _, _, _) = frame.lattice.parameters();
        assert!((a - 4.0).abs() < 0.01);
    }

    #[test]
    fn test_parse_poscar_negative_scale_is_volume() {
        let content = r#"Cu
-64.0
1.0 0.0 0.0
0.0 1.0 0.0
0.0 0.0 1.0
Cu
1
Direct
0.0 0.0 0.0
"#;
        let frame = parse_poscar_content(content, "Cu").unwrap();
        assert!((frame.lattice.volume() - 64.0).abs() < 1e-9);
    }

    #[test]
    fn test_parse_poscar_cartesian() {
        let content = r#"Fe bcc
1.0
2.0 0.0 0.0
0.0 2.0 0.0
0.0 0.0 2.0
Fe
2
Cartesian
0.0 0.0 0.0
1.0 1.0 1.0
"#;
        let frame = parse_poscar_content(content, "Fe").unwrap();
        let p = frame.atoms[1].position;
        assert!((p[0] - 0.5).abs() < 1e-12);
        assert!((p[2] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_parse_poscar_potcar_style_symbols() {
        let content = r#"test
1.0
3.0 0.0 0.0
0.0 3.0 0.0
0.0 0.0 3.0
Fe_pv O
1 1
Direct
0.0 0.0 0.0
0.5 0.5 0.5
"#;
        let frame = parse_poscar_content(content, "x").unwrap();
        assert_eq!(frame.atoms[0].element, "Fe");
    }

    #[test]
    fn test_poscar_round_trip() {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 4.0]]);
        let atoms = vec![
            Atom::new("Ti", [0.0, 0.0, 0.0]),
            Atom::new("O", [0.5, 0.5, 0.0]),
            Atom::new("O", [0.5, 0.0, 0.5]),
        ];
        let frame = Frame::new("TiO2", lattice, atoms);

        let poscar_str = to_poscar_string(&frame);
        let parsed = parse_poscar_content(&poscar_str, "round_trip").unwrap();

        assert_eq!(parsed.atoms.len(), 3);
        let o_count = parsed.atoms.iter().filter(|a| a.element == "O").count();
        assert_eq!(o_count, 2);
    }

    #[test]
    fn test_parse_poscar_selective_dynamics() {
        let content = r#"Fe with selective
1.0
2.87 0.0 0.0
0.0 2.87 0.0
0.0 0.0 2.87
Fe
2
Selective dynamics
Direct
0.0 0.0 0.0 T T T
0.5 0.5 0.5 F F F
"#;
        let frame = parse_poscar_content(content, "Fe").unwrap();
        assert_eq!(frame.atoms.len(), 2);
    }

    #[test]
    fn test_parse_poscar_truncated_positions() {
        let content = r#"Fe
1.0
2.87 0.0 0.0
0.0 2.87 0.0
0.0 0.0 2.87
Fe
2
Direct
0.0 0.0 0.0
"#;
        assert!(parse_poscar_content(content, "Fe").is_err());
    }
}
