//! # Warren-Cowley 化学短程序参数
//!
//! α_ab = 1 − P(b | a 的近邻) / c_b
//!
//! P(b | a) 为 a 原子第一壳层内 b 原子所占比例，c_b 为 b 的全局浓度。
//! α < 0 表示 a-b 倾向相邻，α > 0 表示倾向分离，随机固溶体 α ≈ 0。
//! 某种中心元素在截断内完全没有近邻时 P 无定义，该行记为 NaN。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/wc.rs` 使用
//! - 使用 `neighbors.rs`, `pipeline.rs`

use crate::error::{MdlabError, Result};
use crate::models::Frame;
use crate::neighbors::NeighborList;
use crate::pipeline::FrameAnalysis;

use serde::Serialize;

/// Warren-Cowley 结果
#[derive(Debug, Clone, Serialize)]
pub struct WarrenCowleyResult {
    pub species: Vec<String>,
    /// 全局浓度
    pub composition: Vec<f64>,
    /// alpha[a][b]
    pub alpha: Vec<Vec<f64>>,
    /// 每种中心元素的平均配位数
    pub coordination: Vec<f64>,
    pub frames: usize,
}

impl WarrenCowleyResult {
    pub fn alpha(&self, a: &str, b: &str) -> Option<f64> {
        let ia = self.species.iter().position(|s| s == a)?;
        let ib = self.species.iter().position(|s| s == b)?;
        Some(self.alpha[ia][ib])
    }
}

/// 逐帧累积的 Warren-Cowley 分析
#[derive(Debug, Clone)]
pub struct WarrenCowleyAnalysis {
    cutoff: f64,
    species: Vec<String>,
    /// pair_counts[a][b]：a 中心的近邻中 b 的数目
    pair_counts: Vec<Vec<u64>>,
    atom_counts: Vec<u64>,
    frames: usize,
}

impl WarrenCowleyAnalysis {
    pub fn new(cutoff: f64) -> Result<Self> {
        if !(cutoff > 0.0) {
            return Err(MdlabError::InvalidArgument(format!(
                "Warren-Cowley cutoff must be positive, got {}",
                cutoff
            )));
        }
        Ok(WarrenCowleyAnalysis {
            cutoff,
            species: Vec::new(),
            pair_counts: Vec::new(),
            atom_counts: Vec::new(),
            frames: 0,
        })
    }

    fn species_slot(&mut self, element: &str) -> usize {
        if let Some(s) = self.species.iter().position(|s| s == element) {
            return s;
        }
        self.species.push(element.to_string());
        for row in &mut self.pair_counts {
            row.push(0);
        }
        self.pair_counts.push(vec![0; self.species.len()]);
        self.atom_counts.push(0);
        self.species.len() - 1
    }
}

impl FrameAnalysis for WarrenCowleyAnalysis {
    type Output = WarrenCowleyResult;

    fn name(&self) -> &str {
        "warren-cowley"
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn accumulate(&mut self, frame: &Frame, neighbors: &NeighborList) -> Result<()> {
        let slots: Vec<usize> = frame
            .atoms
            .iter()
            .map(|a| self.species_slot(&a.element))
            .collect();

        let mut isolated = 0;
        for (i, &a) in slots.iter().enumerate() {
            self.atom_counts[a] += 1;
            let shell = neighbors.neighbors(i);
            if shell.is_empty() {
                isolated += 1;
            }
            for n in shell {
                self.pair_counts[a][slots[n.index]] += 1;
            }
        }
        if isolated > 0 {
            log::debug!(
                "{} atom(s) in '{}' have no neighbors within {:.3} Å",
                isolated,
                frame.name,
                self.cutoff
            );
        }

        self.frames += 1;
        Ok(())
    }

    fn finish(self) -> Result<WarrenCowleyResult> {
        let total_atoms: u64 = self.atom_counts.iter().sum();
        let composition: Vec<f64> = self
            .atom_counts
            .iter()
            .map(|&n| n as f64 / total_atoms.max(1) as f64)
            .collect();

        let alpha = self
            .pair_counts
            .iter()
            .zip(&self.species)
            .map(|(row, species)| {
                let shell: u64 = row.iter().sum();
                if shell == 0 {
                    log::warn!(
                        "No {} atom has neighbors within {:.3} Å; its Warren-Cowley row is undefined",
                        species,
                        self.cutoff
                    );
                    return vec![f64::NAN; row.len()];
                }
                row.iter()
                    .zip(&composition)
                    .map(|(&n, &c)| 1.0 - (n as f64 / shell as f64) / c)
                    .collect()
            })
            .collect();

        let coordination = self
            .pair_counts
            .iter()
            .zip(&self.atom_counts)
            .map(|(row, &n)| row.iter().sum::<u64>() as f64 / n.max(1) as f64)
            .collect();

        Ok(WarrenCowleyResult {
            species: self.species,
            composition,
            alpha,
            coordination,
            frames: self.frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, FrameSelection, Lattice, Trajectory};
    use crate::pipeline;
    use crate::test_support::{b2, random_frame};

    fn run_wc(frame: Frame, cutoff: f64) -> WarrenCowleyResult {
        let analysis = WarrenCowleyAnalysis::new(cutoff).unwrap();
        pipeline::run(&Trajectory::single(frame), &FrameSelection::default(), analysis, None).unwrap()
    }

    #[test]
    fn test_b2_is_fully_ordered() {
        // 第一壳层 a√3/2 = 2.598，第二壳层 3.0
        let result = run_wc(b2(3.0, 4, "Ni", "Al"), 2.8);
        assert!((result.alpha("Ni", "Al").unwrap() + 1.0).abs() < 1e-12);
        assert!((result.alpha("Al", "Ni").unwrap() + 1.0).abs() < 1e-12);
        assert!((result.alpha("Ni", "Ni").unwrap() - 1.0).abs() < 1e-12);
        assert!((result.alpha("Al", "Al").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(result.coordination, vec![8.0, 8.0]);
    }

    #[test]
    fn test_random_alloy_is_disordered() {
        let result = run_wc(random_frame(1000, 16.0, &["Cu", "Zr"], 99), 3.0);
        for row in &result.alpha {
            for a in row {
                assert!(a.abs() < 0.05, "alpha = {}", a);
            }
        }
        assert!((result.composition[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_second_shell_of_b2() {
        // 第二壳层全部为同种原子
        let frame = b2(3.0, 4, "Ni", "Al");
        let first = run_wc(frame.clone(), 2.8);
        let both = run_wc(frame, 3.2);
        // 8 个异种 + 6 个同种
        assert!((both.alpha("Ni", "Al").unwrap() - (1.0 - (8.0 / 14.0) / 0.5)).abs() < 1e-12);
        assert!(both.alpha("Ni", "Ni").unwrap() < first.alpha("Ni", "Ni").unwrap());
    }

    #[test]
    fn test_isolated_species_row_is_undefined() {
        // 27 个 Al 排成 2.5 Å 简单立方团簇，Sm 远离团簇
        let mut atoms = Vec::new();
        for i in 0..3 {
            for j in 0..3 {
                for k in 0..3 {
                    let f = |n: i32| n as f64 * 0.125;
                    atoms.push(Atom::new("Al", [f(i), f(j), f(k)]));
                }
            }
        }
        atoms.push(Atom::new("Sm", [0.6, 0.6, 0.6]));
        let frame = Frame::new("cluster", Lattice::orthorhombic(20.0, 20.0, 20.0), atoms);

        let result = run_wc(frame, 3.0);
        assert!(result.alpha("Sm", "Al").unwrap().is_nan());
        assert!(result.alpha("Sm", "Sm").unwrap().is_nan());
        assert!((result.alpha("Al", "Al").unwrap() + 1.0 / 27.0).abs() < 1e-12);
        assert!((result.alpha("Al", "Sm").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(result.coordination[1], 0.0);
    }

    #[test]
    fn test_invalid_cutoff() {
        assert!(WarrenCowleyAnalysis::new(-1.0).is_err());
    }
}
