//! # 近邻列表
//!
//! 三维周期性边界、任意三斜晶胞下的截断半径近邻搜索。
//!
//! ## 算法
//! - 三个方向都能划分出至少 3 个宽度 ≥ 截断半径的格子时，在分数坐标上使用链表格子法，
//!   每个原子只搜索相邻 27 个格子；
//! - 否则显式枚举周期镜像，每个方向 `ceil(rc / 面间距)` 个镜像，
//!   可处理截断半径超过半个盒子（包括原子与自身镜像成键）的情况。
//!
//! 每个原子的近邻列表用 `rayon` 并行构建，按距离升序排列。
//!
//! ## 依赖关系
//! - 被 `pipeline.rs` 与 `analysis/` 使用
//! - 使用 `models/structure.rs`

use crate::error::{MdlabError, Result};
use crate::models::{wrap_unit, Frame};

use rayon::prelude::*;

/// 单个近邻
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// 近邻原子在帧中的下标
    pub index: usize,
    /// 距离 (Å)
    pub distance: f64,
    /// 从中心原子指向近邻镜像的笛卡尔矢量
    pub vector: [f64; 3],
}

/// 一帧的近邻列表
#[derive(Debug, Clone)]
pub struct NeighborList {
    cutoff: f64,
    lists: Vec<Vec<Neighbor>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Auto,
    Images,
}

impl NeighborList {
    /// 构建截断半径内的近邻列表
    pub fn build(frame: &Frame, cutoff: f64) -> Result<Self> {
        Self::build_with(frame, cutoff, Strategy::Auto)
    }

    fn build_with(frame: &Frame, cutoff: f64, strategy: Strategy) -> Result<Self> {
        if !(cutoff > 0.0) || !cutoff.is_finite() {
            return Err(MdlabError::InvalidArgument(format!(
                "Neighbor cutoff must be positive, got {}",
                cutoff
            )));
        }
        if frame.lattice.inverse().is_none() {
            return Err(MdlabError::SingularLattice(frame.lattice.volume()));
        }

        let frac: Vec<[f64; 3]> = frame
            .atoms
            .iter()
            .map(|a| [wrap_unit(a.position[0]), wrap_unit(a.position[1]), wrap_unit(a.position[2])])
            .collect();
        let matrix = frame.lattice.matrix;
        let widths = frame.lattice.perpendicular_widths();

        let bins = [
            (widths[0] / cutoff).floor() as usize,
            (widths[1] / cutoff).floor() as usize,
            (widths[2] / cutoff).floor() as usize,
        ];

        let lists = if strategy == Strategy::Auto && bins.iter().all(|&m| m >= 3) {
            log::debug!(
                "Neighbor search: cell list {}x{}x{} for {} atoms (rc = {:.3})",
                bins[0],
                bins[1],
                bins[2],
                frac.len(),
                cutoff
            );
            cell_list_search(&frac, &matrix, bins, cutoff)
        } else {
            let images = [
                (cutoff / widths[0]).ceil() as i64,
                (cutoff / widths[1]).ceil() as i64,
                (cutoff / widths[2]).ceil() as i64,
            ];
            log::debug!(
                "Neighbor search: image enumeration {:?} for {} atoms (rc = {:.3})",
                images,
                frac.len(),
                cutoff
            );
            image_search(&frac, &matrix, images, cutoff)
        };

        Ok(NeighborList { cutoff, lists })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// 原子 i 的全部近邻
    pub fn neighbors(&self, i: usize) -> &[Neighbor] {
        &self.lists[i]
    }

    /// 原子 i 距离小于 r 的近邻
    pub fn within(&self, i: usize, r: f64) -> &[Neighbor] {
        let list = &self.lists[i];
        let end = list.partition_point(|n| n.distance < r);
        &list[..end]
    }

    /// 配位数
    pub fn coordination(&self, i: usize) -> usize {
        self.lists[i].len()
    }

    /// 原子数
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// 无序原子对数（镜像对分别计数）
    pub fn pair_count(&self) -> usize {
        self.lists.iter().map(|l| l.len()).sum::<usize>() / 2
    }

    /// 平均配位数
    pub fn mean_coordination(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        2.0 * self.pair_count() as f64 / self.lists.len() as f64
    }
}

// ─────────────────────────────────────────────────────────────
// 搜索实现
// ─────────────────────────────────────────────────────────────

fn frac_to_cart(d: [f64; 3], m: &[[f64; 3]; 3]) -> [f64; 3] {
    [
        d[0] * m[0][0] + d[1] * m[1][0] + d[2] * m[2][0],
        d[0] * m[0][1] + d[1] * m[1][1] + d[2] * m[2][1],
        d[0] * m[0][2] + d[1] * m[1][2] + d[2] * m[2][2],
    ]
}

fn try_push(
    out: &mut Vec<Neighbor>,
    j: usize,
    df: [f64; 3],
    m: &[[f64; 3]; 3],
    rc2: f64,
) {
    let v = frac_to_cart(df, m);
    let d2 = v[0] * v[0] + v[1] * v[1] + v[2] * v[2];
    if d2 < rc2 {
        out.push(Neighbor {
            index: j,
            distance: d2.sqrt(),
            vector: v,
        });
    }
}

fn sort_by_distance(list: &mut [Neighbor]) {
    list.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index)));
}

fn cell_list_search(
    frac: &[[f64; 3]],
    m: &[[f64; 3]; 3],
    bins: [usize; 3],
    cutoff: f64,
) -> Vec<Vec<Neighbor>> {
    let rc2 = cutoff * cutoff;
    let bin_of = |f: &[f64; 3]| -> [usize; 3] {
        let mut b = [0usize; 3];
        for k in 0..3 {
            b[k] = ((f[k] * bins[k] as f64) as usize).min(bins[k] - 1);
        }
        b
    };
    let flat = |b: [usize; 3]| (b[0] * bins[1] + b[1]) * bins[2] + b[2];

    let mut cells: Vec<Vec<usize>> = vec![Vec::new(); bins[0] * bins[1] * bins[2]];
    for (i, f) in frac.iter().enumerate() {
        cells[flat(bin_of(f))].push(i);
    }

    (0..frac.len())
        .into_par_iter()
        .map(|i| {
            let fi = frac[i];
            let home = bin_of(&fi);
            let mut out = Vec::new();

            for d0 in -1i64..=1 {
                for d1 in -1i64..=1 {
                    for d2 in -1i64..=1 {
                        let mut cell = [0usize; 3];
                        let mut shift = [0.0f64; 3];
                        for (k, d) in [d0, d1, d2].into_iter().enumerate() {
                            let nb = home[k] as i64 + d;
                            let m_k = bins[k] as i64;
                            let s = nb.div_euclid(m_k);
                            cell[k] = nb.rem_euclid(m_k) as usize;
                            shift[k] = s as f64;
                        }
                        let self_image = shift == [0.0; 3];

                        for &j in &cells[flat(cell)] {
                            if j == i && self_image {
                                continue;
                            }
                            let fj = frac[j];
                            let df = [
                                fj[0] + shift[0] - fi[0],
                                fj[1] + shift[1] - fi[1],
                                fj[2] + shift[2] - fi[2],
                            ];
                            try_push(&mut out, j, df, m, rc2);
                        }
                    }
                }
            }

            sort_by_distance(&mut out);
            out
        })
        .collect()
}

fn image_search(
    frac: &[[f64; 3]],
    m: &[[f64; 3]; 3],
    images: [i64; 3],
    cutoff: f64,
) -> Vec<Vec<Neighbor>> {
    let rc2 = cutoff * cutoff;

    (0..frac.len())
        .into_par_iter()
        .map(|i| {
            let fi = frac[i];
            let mut out = Vec::new();

            for (j, fj) in frac.iter().enumerate() {
                let base = [fj[0] - fi[0], fj[1] - fi[1], fj[2] - fi[2]];
                for s0 in -images[0]..=images[0] {
                    for s1 in -images[1]..=images[1] {
                        for s2 in -images[2]..=images[2] {
                            if j == i && s0 == 0 && s1 == 0 && s2 == 0 {
                                continue;
                            }
                            let df = [
                                base[0] + s0 as f64,
                                base[1] + s1 as f64,
                                base[2] + s2 as f64,
                            ];
                            try_push(&mut out, j, df, m, rc2);
                        }
                    }
                }
            }

            sort_by_distance(&mut out);
            out
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::test_support::{bcc, fcc, random_frame};

    #[test]
    fn test_fcc_supercell_coordination() {
        // 4x4x4 超胞：16.2 / 3.0 → 5 个格子，走链表格子法
        let frame = fcc(4.05, 4, "Al");
        let nl = NeighborList::build(&frame, 3.0).unwrap();
        assert_eq!(nl.len(), 256);
        assert!(!nl.is_empty());
        for i in 0..nl.len() {
            assert_eq!(nl.coordination(i), 12);
            assert!((nl.neighbors(i)[0].distance - 4.05 / 2f64.sqrt()).abs() < 1e-9);
        }
        assert_eq!(nl.pair_count(), 256 * 6);
        assert!((nl.mean_coordination() - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_small_cell_uses_images() {
        // 单个 fcc 晶胞（4 个原子）需要镜像枚举
        let frame = fcc(4.05, 1, "Al");
        let nl = NeighborList::build(&frame, 3.0).unwrap();
        for i in 0..4 {
            assert_eq!(nl.coordination(i), 12);
        }
        // 第二壳层 a = 4.05 包括自身镜像
        let nl = NeighborList::build(&frame, 4.1).unwrap();
        for i in 0..4 {
            assert_eq!(nl.coordination(i), 18);
            assert_eq!(nl.within(i, 3.0).len(), 12);
            assert!(nl.neighbors(i).iter().any(|n| n.index == i));
        }
    }

    #[test]
    fn test_bcc_shells() {
        let frame = bcc(3.0, 4, "Fe");
        let nl = NeighborList::build(&frame, 3.2).unwrap();
        for i in 0..nl.len() {
            assert_eq!(nl.within(i, 2.8).len(), 8);
            assert_eq!(nl.coordination(i), 14);
        }
    }

    #[test]
    fn test_cell_list_matches_images() {
        let frame = random_frame(300, 15.0, &["Al", "Sm"], 7);
        let fast = NeighborList::build_with(&frame, 3.5, Strategy::Auto).unwrap();
        let slow = NeighborList::build_with(&frame, 3.5, Strategy::Images).unwrap();
        for i in 0..frame.len() {
            let a: Vec<usize> = fast.neighbors(i).iter().map(|n| n.index).collect();
            let b: Vec<usize> = slow.neighbors(i).iter().map(|n| n.index).collect();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_symmetry_triclinic() {
        let lattice = Lattice::from_parameters(9.0, 10.0, 11.0, 80.0, 100.0, 115.0);
        let mut frame = random_frame(60, 1.0, &["Cu"], 11);
        frame.lattice = lattice;
        let nl = NeighborList::build(&frame, 4.0).unwrap();

        for i in 0..frame.len() {
            for n in nl.neighbors(i) {
                let back = nl.neighbors(n.index).iter().any(|m| {
                    m.index == i
                        && (0..3).all(|k| (m.vector[k] + n.vector[k]).abs() < 1e-9)
                });
                assert!(back, "pair {}-{} is not symmetric", i, n.index);
            }
        }
    }

    #[test]
    fn test_vector_points_to_neighbor() {
        let frame = Frame::new(
            "pair",
            Lattice::orthorhombic(10.0, 10.0, 10.0),
            vec![Atom::new("Al", [0.05, 0.5, 0.5]), Atom::new("Al", [0.95, 0.5, 0.5])],
        );
        let nl = NeighborList::build(&frame, 2.0).unwrap();
        let n = nl.neighbors(0)[0];
        assert_eq!(n.index, 1);
        assert!((n.distance - 1.0).abs() < 1e-9);
        assert!((n.vector[0] + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_cutoff() {
        let frame = fcc(4.05, 1, "Al");
        assert!(NeighborList::build(&frame, 0.0).is_err());
        assert!(NeighborList::build(&frame, -1.0).is_err());
    }
}
