//! # 原子结构数据模型
//!
//! 所有格式解析器产出的统一结构表示：晶格 + 原子（分数坐标）。
//! 分析模块只依赖本模块，不关心来源格式。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `neighbors`, `analysis/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};

/// 晶格参数表示
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let cos_alpha = alpha.to_radians().cos();
        let cos_beta = beta.to_radians().cos();
        let cos_gamma = gamma.to_radians().cos();
        let sin_gamma = gamma.to_radians().sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();

        Lattice {
            matrix: [a_vec, b_vec, [c1, c2, c3]],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 正交盒子
    pub fn orthorhombic(lx: f64, ly: f64, lz: f64) -> Self {
        Lattice {
            matrix: [[lx, 0.0, 0.0], [0.0, ly, 0.0], [0.0, 0.0, lz]],
        }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let [a_vec, b_vec, c_vec] = self.matrix;

        let a = norm(&a_vec);
        let b = norm(&b_vec);
        let c = norm(&c_vec);

        let alpha = (dot(&b_vec, &c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(&a_vec, &c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(&a_vec, &b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积（带符号的行列式）
    pub fn volume(&self) -> f64 {
        let [a, b, c] = self.matrix;
        dot(&a, &cross(&b, &c))
    }

    /// 逆矩阵；奇异晶格返回 None
    pub fn inverse(&self) -> Option<[[f64; 3]; 3]> {
        let m = self.matrix;
        let det = self.volume();
        if det.abs() < 1e-10 {
            return None;
        }

        Some([
            [
                (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
                (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
                (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
            ],
            [
                (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
                (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
                (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
            ],
            [
                (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
                (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
                (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
            ],
        ])
    }

    /// 分数坐标转笛卡尔坐标
    pub fn to_cartesian(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }

    /// 笛卡尔坐标转分数坐标；奇异晶格原样返回
    pub fn to_fractional(&self, cart: [f64; 3]) -> [f64; 3] {
        match self.inverse() {
            Some(inv) => [
                inv[0][0] * cart[0] + inv[1][0] * cart[1] + inv[2][0] * cart[2],
                inv[0][1] * cart[0] + inv[1][1] * cart[1] + inv[2][1] * cart[2],
                inv[0][2] * cart[0] + inv[1][2] * cart[1] + inv[2][2] * cart[2],
            ],
            None => cart,
        }
    }

    /// 三个方向的面间距（晶面法向宽度）：V / |b×c|, V / |c×a|, V / |a×b|
    pub fn perpendicular_widths(&self) -> [f64; 3] {
        let [a, b, c] = self.matrix;
        let v = self.volume().abs();
        [
            v / norm(&cross(&b, &c)),
            v / norm(&cross(&c, &a)),
            v / norm(&cross(&a, &b)),
        ]
    }

    /// 是否为正交盒子（非对角元全为 0）
    pub fn is_orthogonal(&self) -> bool {
        let m = self.matrix;
        (0..3).all(|i| (0..3).all(|j| i == j || m[i][j].abs() < 1e-12))
    }
}

/// 原子信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],

    /// 可选：原始编号（LAMMPS id 等）
    pub id: Option<u64>,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
            id: None,
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }
}

/// 单帧结构（快照）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,

    /// MD 步数（LAMMPS timestep / XDATCAR configuration 编号）
    pub timestep: Option<u64>,

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl Frame {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Frame {
            name: name.into(),
            lattice,
            atoms,
            timestep: None,
            source_format: None,
        }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    /// 元素种类，按首次出现顺序
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !species.contains(&atom.element) {
                species.push(atom.element.clone());
            }
        }
        species
    }

    /// 每个原子对应的元素序号（对应 `species()` 的下标）
    pub fn species_indices(&self, species: &[String]) -> Vec<usize> {
        self.atoms
            .iter()
            .map(|a| {
                species
                    .iter()
                    .position(|s| *s == a.element)
                    .unwrap_or(usize::MAX)
            })
            .collect()
    }

    /// 各元素原子数，按 `species()` 顺序
    pub fn species_counts(&self) -> Vec<(String, usize)> {
        self.species()
            .into_iter()
            .map(|s| {
                let n = self.atoms.iter().filter(|a| a.element == s).count();
                (s, n)
            })
            .collect()
    }

    /// 摩尔分数
    pub fn composition(&self) -> Vec<(String, f64)> {
        let total = self.atoms.len().max(1) as f64;
        self.species_counts()
            .into_iter()
            .map(|(s, n)| (s, n as f64 / total))
            .collect()
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        self.species_counts()
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 数密度 (atoms/Å³)
    pub fn number_density(&self) -> f64 {
        let v = self.lattice.volume().abs();
        if v > 0.0 {
            self.atoms.len() as f64 / v
        } else {
            0.0
        }
    }

    /// 每原子体积 (Å³)
    pub fn volume_per_atom(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        Some(self.lattice.volume().abs() / self.atoms.len() as f64)
    }

    /// 笛卡尔坐标
    pub fn cartesian_positions(&self) -> Vec<[f64; 3]> {
        self.atoms
            .iter()
            .map(|a| self.lattice.to_cartesian(a.position))
            .collect()
    }

    /// 将分数坐标折回 [0, 1)
    pub fn wrap(&mut self) {
        for atom in &mut self.atoms {
            for x in atom.position.iter_mut() {
                *x = wrap_unit(*x);
            }
        }
    }
}

/// 折回 [0, 1)
pub fn wrap_unit(x: f64) -> f64 {
    let w = x - x.floor();
    // x.floor() 对 -1e-17 之类的值可能给出 1.0
    if w >= 1.0 {
        0.0
    } else {
        w
    }
}

/// 向量叉积
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量点积
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 向量模长
pub fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_from_parameters_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let (a, b, c, alpha, beta, gamma) = lattice.parameters();

        assert!((a - 5.0).abs() < 1e-6);
        assert!((b - 5.0).abs() < 1e-6);
        assert!((c - 5.0).abs() < 1e-6);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((beta - 90.0).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_hexagonal() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let (a, _, c, _, _, gamma) = lattice.parameters();

        assert!((a - 3.0).abs() < 0.01);
        assert!((c - 5.0).abs() < 0.01);
        assert!((gamma - 120.0).abs() < 0.01);
        assert!(!lattice.is_orthogonal());
    }

    #[test]
    fn test_fractional_round_trip_triclinic() {
        let lattice = Lattice::from_vectors([[4.0, 0.0, 0.0], [1.0, 5.0, 0.0], [0.5, 0.7, 6.0]]);
        let frac = [0.1, 0.45, 0.9];
        let back = lattice.to_fractional(lattice.to_cartesian(frac));
        for k in 0..3 {
            assert!((back[k] - frac[k]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_perpendicular_widths_orthogonal() {
        let lattice = Lattice::orthorhombic(3.0, 4.0, 5.0);
        let w = lattice.perpendicular_widths();
        assert!((w[0] - 3.0).abs() < 1e-12);
        assert!((w[1] - 4.0).abs() < 1e-12);
        assert!((w[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_singular_lattice_has_no_inverse() {
        let lattice = Lattice::from_vectors([[1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(lattice.inverse().is_none());
    }

    #[test]
    fn test_frame_composition_and_density() {
        let lattice = Lattice::orthorhombic(2.0, 2.0, 2.0);
        let atoms = vec![
            Atom::new("Al", [0.0, 0.0, 0.0]),
            Atom::new("Sm", [0.5, 0.5, 0.5]),
            Atom::new("Al", [0.5, 0.0, 0.5]),
            Atom::new("Al", [0.0, 0.5, 0.5]),
        ];
        let frame = Frame::new("AlSm", lattice, atoms);

        assert_eq!(frame.species(), vec!["Al".to_string(), "Sm".to_string()]);
        assert_eq!(frame.formula(), "Al3Sm");
        let comp = frame.composition();
        assert!((comp[0].1 - 0.75).abs() < 1e-12);
        assert!((frame.number_density() - 0.5).abs() < 1e-12);
        assert_eq!(frame.volume_per_atom(), Some(2.0));

        let empty = Frame::new("void", Lattice::orthorhombic(2.0, 2.0, 2.0), Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.volume_per_atom(), None);
    }

    #[test]
    fn test_wrap_unit() {
        assert!((wrap_unit(1.25) - 0.25).abs() < 1e-12);
        assert!((wrap_unit(-0.25) - 0.75).abs() < 1e-12);
        assert_eq!(wrap_unit(-1e-18), 0.0);
    }
}
