//! # LAMMPS data 文件写出
//!
//! 生成 `atom_style atomic` 的 data 文件；非正交盒子写出 `xy xz yz` 倾斜因子。
//!
//! ## 格式说明
//! ```text
//! comment
//!
//! 4000 atoms
//! 2 atom types
//!
//! 0.0 40.5 xlo xhi
//! 0.0 40.5 ylo yhi
//! 0.0 40.5 zlo zhi
//! 0.0 0.0 0.0 xy xz yz          (仅三斜)
//!
//! Atoms # atomic
//!
//! 1 1 0.0 0.0 0.0
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs`, `parsers/voro.rs` 使用

use crate::models::{dot, norm, Frame};

/// 将任意晶格转换为 LAMMPS 约定的下三角形式 `[[lx,0,0],[xy,ly,0],[xz,yz,lz]]`
///
/// 分数坐标在旋转前后保持不变。
pub fn restricted_triclinic(matrix: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let [a, b, c] = *matrix;
    let lx = norm(&a);
    let a_hat = [a[0] / lx, a[1] / lx, a[2] / lx];

    let xy = dot(&b, &a_hat);
    let ly = (dot(&b, &b) - xy * xy).max(0.0).sqrt();
    let xz = dot(&c, &a_hat);
    let yz = (dot(&b, &c) - xy * xz) / ly;
    let lz = (dot(&c, &c) - xz * xz - yz * yz).max(0.0).sqrt();

    [[lx, 0.0, 0.0], [xy, ly, 0.0], [xz, yz, lz]]
}

/// 生成 LAMMPS data 文件内容（type 顺序 = frame.species()）
pub fn to_lammps_data_string(frame: &Frame) -> String {
    let species = frame.species();
    let types = frame.species_indices(&species);
    let m = restricted_triclinic(&frame.lattice.matrix);
    let tilted = [m[1][0], m[2][0], m[2][1]].iter().any(|t| t.abs() > 1e-10);

    let mut out = String::new();
    out.push_str(&format!("{} (written by mdlab)\n\n", frame.name));
    out.push_str(&format!("{} atoms\n", frame.len()));
    out.push_str(&format!("{} atom types\n\n", species.len()));
    out.push_str(&format!("{:16.10} {:16.10} xlo xhi\n", 0.0, m[0][0]));
    out.push_str(&format!("{:16.10} {:16.10} ylo yhi\n", 0.0, m[1][1]));
    out.push_str(&format!("{:16.10} {:16.10} zlo zhi\n", 0.0, m[2][2]));
    if tilted {
        out.push_str(&format!(
            "{:16.10} {:16.10} {:16.10} xy xz yz\n",
            m[1][0], m[2][0], m[2][1]
        ));
    }

    // type 对应的元素写在注释里，方便 pair_coeff 对照
    out.push_str("\n# type ->");
    for (t, elem) in species.iter().enumerate() {
        out.push_str(&format!(" {}:{}", t + 1, elem));
    }
    out.push_str("\n\nAtoms # atomic\n\n");

    for (i, (atom, t)) in frame.atoms.iter().zip(&types).enumerate() {
        let f = atom.position;
        let x = f[0] * m[0][0] + f[1] * m[1][0] + f[2] * m[2][0];
        let y = f[1] * m[1][1] + f[2] * m[2][1];
        let z = f[2] * m[2][2];
        let id = atom.id.unwrap_or(i as u64 + 1);
        out.push_str(&format!("{} {} {:.10} {:.10} {:.10}\n", id, t + 1, x, y, z));
    }

    out
}
