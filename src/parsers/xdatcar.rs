//! # VASP XDATCAR 解析器
//!
//! 解析 MD/弛豫过程中每个离子步的构型。
//!
//! ## 格式说明
//! ```text
//! <POSCAR 头部：名称、缩放、晶格、元素、计数>
//! Direct configuration=     1
//! x y z
//! ...
//! Direct configuration=     2
//! ...
//! ```
//! 变胞计算（ISIF=3）每一帧前都会重复整个头部。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 复用 `parsers/poscar.rs` 的头部解析

use crate::error::{MdlabError, Result};
use crate::models::{Atom, Frame, Trajectory};
use crate::parsers::poscar::{parse_header, read_positions, PoscarHeader};

use std::fs;
use std::path::Path;

/// 解析 XDATCAR 文件
pub fn parse_xdatcar_file(path: &Path) -> Result<Trajectory> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_xdatcar_content(
        &content,
        path.file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("XDATCAR"),
    )
}

/// 从字符串内容解析 XDATCAR
pub fn parse_xdatcar_content(content: &str, default_name: &str) -> Result<Trajectory> {
    let lines: Vec<&str> = content.lines().collect();
    let mut header = parse_header(&lines, 0, default_name, "xdatcar")?;
    let mut elements = header.element_sequence();
    let n_atoms = header.total_atoms();

    let mut frames: Vec<Frame> = Vec::new();
    let mut idx = header.next_line;

    while idx < lines.len() {
        let line = lines[idx].trim();

        if line.is_empty() {
            idx += 1;
            continue;
        }

        if is_configuration_line(line) {
            let timestep = line
                .split('=')
                .nth(1)
                .and_then(|s| s.split_whitespace().next())
                .and_then(|s| s.parse::<u64>().ok());
            let is_cartesian = line.to_lowercase().starts_with('c');

            let positions = read_positions(&lines, idx + 1, n_atoms, &header.name, "xdatcar")?;
            let atoms: Vec<Atom> = elements
                .iter()
                .zip(positions)
                .map(|(e, p)| {
                    let pos = if is_cartesian {
                        let s = header.scale;
                        header.lattice.to_fractional([p[0] * s, p[1] * s, p[2] * s])
                    } else {
                        p
                    };
                    Atom::new(e.clone(), pos)
                })
                .collect();

            let mut frame = Frame::new(header.name.clone(), header.lattice, atoms);
            frame.timestep = timestep;
            frame.source_format = Some("xdatcar".to_string());
            frames.push(frame);

            idx += 1 + n_atoms;
        } else {
            // 变胞 XDATCAR：重复的头部
            let new_header: PoscarHeader =
                parse_header(&lines, idx, &header.name, "xdatcar")?;
            if new_header.total_atoms() != n_atoms {
                return Err(MdlabError::InconsistentAtomCount {
                    frame: frames.len(),
                    expected: n_atoms,
                    found: new_header.total_atoms(),
                });
            }
            elements = new_header.element_sequence();
            idx = new_header.next_line;
            header = new_header;
        }
    }

    if frames.is_empty() {
        return Err(MdlabError::parse(
            "xdatcar",
            default_name,
            "No 'Direct configuration=' block found",
        ));
    }

    log::debug!(
        "XDATCAR '{}': {} frames, {} atoms",
        header.name,
        frames.len(),
        n_atoms
    );

    Ok(Trajectory::new(frames))
}

fn is_configuration_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    (lower.starts_with("direct") || lower.starts_with("cartesian"))
        && lower.contains("configuration")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXED_CELL: &str = r#"Ar
           1
     5.000000    0.000000    0.000000
     0.000000    5.000000    0.000000
     0.000000    0.000000    5.000000
   Ar
     2
Direct configuration=     1
  0.00000000  0.00000000  0.00000000
  0.50000000  0.50000000  0.50000000
Direct configuration=     2
  0.01000000  0.00000000  0.00000000
  0.51000000  0.50000000  0.50000000
Direct configuration=     3
  0.02000000  0.00000000  0.00000000
  0.52000000  0.50000000  0.50000000
"#;

    #[test]
    fn test_parse_fixed_cell() {
        let traj = parse_xdatcar_content(FIXED_CELL, "XDATCAR").unwrap();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.frames[2].timestep, Some(3));
        assert!((traj.frames[2].atoms[0].position[0] - 0.02).abs() < 1e-12);
        assert_eq!(traj.frames[0].atoms[1].element, "Ar");
    }

    #[test]
    fn test_parse_variable_cell() {
        let content = r#"Ar
1.0
5.0 0.0 0.0
0.0 5.0 0.0
0.0 0.0 5.0
Ar
1
Direct configuration=     1
0.0 0.0 0.0
Ar
1.0
6.0 0.0 0.0
0.0 6.0 0.0
0.0 0.0 6.0
Ar
1
Direct configuration=     2
0.1 0.0 0.0
"#;
        let traj = parse_xdatcar_content(content, "XDATCAR").unwrap();
        assert_eq!(traj.len(), 2);
        assert!((traj.frames[0].lattice.volume() - 125.0).abs() < 1e-9);
        assert!((traj.frames[1].lattice.volume() - 216.0).abs() < 1e-9);
    }

    #[test]
    fn test_truncated_frame_is_error() {
        let content = FIXED_CELL.lines().take(15).collect::<Vec<_>>().join("\n");
        assert!(parse_xdatcar_content(&content, "XDATCAR").is_err());
    }
}
