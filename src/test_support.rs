//! 测试用的理想结构与伪随机构型

use crate::models::{Atom, Frame, Lattice};

/// n×n×n 的 fcc 超胞
pub fn fcc(a: f64, n: usize, element: &str) -> Frame {
    let basis = [[0.0, 0.0, 0.0], [0.5, 0.5, 0.0], [0.5, 0.0, 0.5], [0.0, 0.5, 0.5]];
    supercell(a, n, &basis, |_| element.to_string(), "fcc")
}

/// n×n×n 的 bcc 超胞
pub fn bcc(a: f64, n: usize, element: &str) -> Frame {
    let basis = [[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]];
    supercell(a, n, &basis, |_| element.to_string(), "bcc")
}

/// B2 (CsCl) 有序结构：角位 a，体心 b
pub fn b2(a: f64, n: usize, corner: &str, center: &str) -> Frame {
    let basis = [[0.0, 0.0, 0.0], [0.5, 0.5, 0.5]];
    supercell(
        a,
        n,
        &basis,
        |k| if k == 0 { corner.to_string() } else { center.to_string() },
        "b2",
    )
}

fn supercell(
    a: f64,
    n: usize,
    basis: &[[f64; 3]],
    element: impl Fn(usize) -> String,
    name: &str,
) -> Frame {
    let nf = n as f64;
    let mut atoms = Vec::new();
    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                for (b, p) in basis.iter().enumerate() {
                    atoms.push(Atom::new(
                        element(b),
                        [
                            (i as f64 + p[0]) / nf,
                            (j as f64 + p[1]) / nf,
                            (k as f64 + p[2]) / nf,
                        ],
                    ));
                }
            }
        }
    }
    let l = a * nf;
    Frame::new(name, Lattice::orthorhombic(l, l, l), atoms)
}

/// 线性同余伪随机数，保证测试可重复
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Lcg(seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407))
    }

    /// [0, 1) 均匀分布
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// 立方盒子中的随机（理想气体）构型
pub fn random_frame(n_atoms: usize, box_length: f64, elements: &[&str], seed: u64) -> Frame {
    let mut rng = Lcg::new(seed);
    let atoms = (0..n_atoms)
        .map(|i| {
            Atom::new(
                elements[i % elements.len()],
                [rng.next_f64(), rng.next_f64(), rng.next_f64()],
            )
        })
        .collect();
    Frame::new(
        "random",
        Lattice::orthorhombic(box_length, box_length, box_length),
        atoms,
    )
}
