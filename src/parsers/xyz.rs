//! # 扩展 XYZ 格式
//!
//! ## 格式说明
//! ```text
//! 4
//! Lattice="4.05 0 0 0 4.05 0 0 0 4.05" Properties=species:S:1:pos:R:3 pbc="T T T"
//! Al 0.0 0.0 0.0
//! ...
//! ```
//!
//! 写出多帧轨迹时逐帧拼接；读取时要求注释行带 `Lattice=`。
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `regex` 提取 Lattice 字段

use crate::error::{MdlabError, Result};
use crate::models::{Atom, Frame, Lattice, Trajectory};

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

const FORMAT: &str = "xyz";

static LATTICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Lattice\s*=\s*"([^"]+)""#).expect("static regex"));

static TIMESTEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Timestep\s*=\s*(\d+)").expect("static regex"));

/// 生成单帧扩展 XYZ
pub fn to_xyz_string(frame: &Frame) -> String {
    let m = frame.lattice.matrix;
    let mut out = String::new();
    out.push_str(&format!("{}\n", frame.len()));
    out.push_str(&format!(
        "Lattice=\"{} {} {} {} {} {} {} {} {}\" Properties=species:S:1:pos:R:3 pbc=\"T T T\"",
        m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2]
    ));
    if let Some(step) = frame.timestep {
        out.push_str(&format!(" Timestep={}", step));
    }
    out.push('\n');

    for (atom, pos) in frame.atoms.iter().zip(frame.cartesian_positions()) {
        out.push_str(&format!(
            "{:<3} {:16.10} {:16.10} {:16.10}\n",
            atom.element, pos[0], pos[1], pos[2]
        ));
    }
    out
}

/// 生成多帧扩展 XYZ
pub fn trajectory_to_xyz_string(trajectory: &Trajectory) -> String {
    trajectory.frames.iter().map(to_xyz_string).collect()
}

/// 解析扩展 XYZ 文件
pub fn parse_xyz_file(path: &Path) -> Result<Trajectory> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_xyz_content(&content, &path.display().to_string())
}

/// 从字符串内容解析（可多帧）
pub fn parse_xyz_content(content: &str, name: &str) -> Result<Trajectory> {
    let lines: Vec<&str> = content.lines().collect();
    let mut frames = Vec::new();
    let mut idx = 0;

    while idx < lines.len() {
        if lines[idx].trim().is_empty() {
            idx += 1;
            continue;
        }
        let natoms: usize = lines[idx].trim().parse().map_err(|_| {
            MdlabError::parse(FORMAT, name, format!("Bad atom count: {}", lines[idx].trim()))
        })?;
        let comment = lines
            .get(idx + 1)
            .ok_or_else(|| MdlabError::parse(FORMAT, name, "Missing comment line"))?;
        let lattice = parse_lattice(comment)
            .ok_or_else(|| MdlabError::parse(FORMAT, name, "Comment line has no Lattice=\"...\""))?;
        if lattice.inverse().is_none() {
            return Err(MdlabError::SingularLattice(lattice.volume()));
        }

        let mut atoms = Vec::with_capacity(natoms);
        for k in 0..natoms {
            let line = lines.get(idx + 2 + k).ok_or_else(|| {
                MdlabError::parse(FORMAT, name, format!("Frame {} is truncated", frames.len() + 1))
            })?;
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return Err(MdlabError::parse(FORMAT, name, format!("Bad atom line: {}", line.trim())));
            }
            let mut cart = [0.0; 3];
            for (c, s) in cart.iter_mut().zip(&parts[1..4]) {
                *c = s
                    .parse()
                    .map_err(|_| MdlabError::parse(FORMAT, name, format!("Bad number '{}'", s)))?;
            }
            atoms.push(Atom::new(parts[0], lattice.to_fractional(cart)).with_id(k as u64 + 1));
        }

        let mut frame = Frame::new(format!("{}#{}", name, frames.len() + 1), lattice, atoms);
        frame.source_format = Some(FORMAT.to_string());
        frame.timestep = TIMESTEP_RE
            .captures(comment)
            .and_then(|cap| cap[1].parse().ok());
        frames.push(frame);
        idx += 2 + natoms;
    }

    if frames.is_empty() {
        return Err(MdlabError::parse(FORMAT, name, "No frames found"));
    }
    let trajectory = Trajectory::new(frames);
    trajectory.check_consistent()?;
    Ok(trajectory)
}

fn parse_lattice(comment: &str) -> Option<Lattice> {
    let cap = LATTICE_RE.captures(comment)?;
    let vals: Vec<f64> = cap[1]
        .split_whitespace()
        .map(|s| s.parse::<f64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    if vals.len() != 9 {
        return None;
    }
    Some(Lattice::from_vectors([
        [vals[0], vals[1], vals[2]],
        [vals[3], vals[4], vals[5]],
        [vals[6], vals[7], vals[8]],
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_frame() -> Frame {
        Frame::new(
            "AlSm",
            Lattice::orthorhombic(10.0, 8.0, 6.0),
            vec![Atom::new("Al", [0.0, 0.0, 0.0]), Atom::new("Sm", [0.5, 0.25, 0.5])],
        )
    }

    #[test]
    fn test_write_xyz() {
        let text = to_xyz_string(&sample_frame());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2");
        assert!(lines[1].starts_with("Lattice=\"10 0 0 0 8 0 0 0 6\""));
        assert!(lines[2].starts_with("Al"));
        assert!(lines[3].contains("5.0000000000"));
    }

    #[test]
    fn test_read_back_two_frames() {
        let mut frame = sample_frame();
        frame.timestep = Some(100);
        let traj = Trajectory::new(vec![frame.clone(), frame]);
        let text = trajectory_to_xyz_string(&traj);
        let again = parse_xyz_content(&text, "t.xyz").unwrap();
        assert_eq!(again.len(), 2);
        assert_eq!(again.frames[0].timestep, Some(100));
        let p = again.frames[1].atoms[1].position;
        assert!((p[0] - 0.5).abs() < 1e-9 && (p[1] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_missing_lattice() {
        let text = "1\nplain comment\nAl 0 0 0\n";
        assert!(parse_xyz_content(text, "t.xyz").is_err());
    }
}
