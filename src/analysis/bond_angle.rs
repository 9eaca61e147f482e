//! # 键角分布
//!
//! 对每个中心原子 i 的每一对近邻 (j, k)，统计 j–i–k 夹角（度）。
//! 直方图覆盖 [0°, 180°]，归一化为单位面积；可按中心原子元素给出分量。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/bad.rs` 使用
//! - 使用 `neighbors.rs`, `pipeline.rs`

use crate::error::{MdlabError, Result};
use crate::models::{dot, Frame};
use crate::neighbors::NeighborList;
use crate::pipeline::FrameAnalysis;

use serde::Serialize;

/// 键角分布参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BondAngleParams {
    /// 成键截断 (Å)
    pub cutoff: f64,
    /// 直方图格数
    pub bins: usize,
}

impl Default for BondAngleParams {
    fn default() -> Self {
        BondAngleParams {
            cutoff: 3.0,
            bins: 180,
        }
    }
}

/// 键角分布结果
#[derive(Debug, Clone, Serialize)]
pub struct BondAngleResult {
    /// 格中心 (度)
    pub angle: Vec<f64>,
    /// 所有中心原子的分布 (1/度)
    pub total: Vec<f64>,
    /// (中心元素, 分布)
    pub partial: Vec<(String, Vec<f64>)>,
    /// 统计的键角数
    pub triplets: u64,
    pub frames: usize,
}

impl BondAngleResult {
    /// 格宽 (度)
    pub fn width(&self) -> f64 {
        180.0 / self.angle.len() as f64
    }

    /// 分布峰值所在角度
    pub fn peak(&self) -> Option<f64> {
        self.total
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(k, _)| self.angle[k])
    }
}

/// 逐帧累积的键角分布
#[derive(Debug, Clone)]
pub struct BondAngleAnalysis {
    params: BondAngleParams,
    species: Vec<String>,
    counts: Vec<Vec<u64>>,
    frames: usize,
}

impl BondAngleAnalysis {
    pub fn new(params: BondAngleParams) -> Result<Self> {
        if !(params.cutoff > 0.0) {
            return Err(MdlabError::InvalidArgument(format!(
                "Bond angle cutoff must be positive, got {}",
                params.cutoff
            )));
        }
        if params.bins == 0 {
            return Err(MdlabError::InvalidArgument(
                "Number of angle bins must be at least 1".to_string(),
            ));
        }
        Ok(BondAngleAnalysis {
            params,
            species: Vec::new(),
            counts: Vec::new(),
            frames: 0,
        })
    }

    fn species_slot(&mut self, element: &str) -> usize {
        match self.species.iter().position(|s| s == element) {
            Some(s) => s,
            None => {
                self.species.push(element.to_string());
                self.counts.push(vec![0; self.params.bins]);
                self.species.len() - 1
            }
        }
    }
}

/// 两矢量夹角 (度)
pub fn angle_between(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    let cos = dot(a, b) / (dot(a, a) * dot(b, b)).sqrt();
    cos.clamp(-1.0, 1.0).acos().to_degrees()
}

impl FrameAnalysis for BondAngleAnalysis {
    type Output = BondAngleResult;

    fn name(&self) -> &str {
        "bond-angle"
    }

    fn cutoff(&self) -> f64 {
        self.params.cutoff
    }

    fn accumulate(&mut self, frame: &Frame, neighbors: &NeighborList) -> Result<()> {
        let bins = self.params.bins;
        let width = 180.0 / bins as f64;

        for (i, atom) in frame.atoms.iter().enumerate() {
            let slot = self.species_slot(&atom.element);
            let shell = neighbors.neighbors(i);
            for a in 0..shell.len() {
                for b in a + 1..shell.len() {
                    let theta = angle_between(&shell[a].vector, &shell[b].vector);
                    let k = ((theta / width) as usize).min(bins - 1);
                    self.counts[slot][k] += 1;
                }
            }
        }

        self.frames += 1;
        Ok(())
    }

    fn finish(self) -> Result<BondAngleResult> {
        let bins = self.params.bins;
        let width = 180.0 / bins as f64;
        let angle = (0..bins).map(|k| (k as f64 + 0.5) * width).collect();

        let normalise = |h: &[u64]| -> Vec<f64> {
            let n: u64 = h.iter().sum();
            if n == 0 {
                return vec![0.0; h.len()];
            }
            h.iter().map(|&c| c as f64 / (n as f64 * width)).collect()
        };

        let mut sum = vec![0u64; bins];
        for h in &self.counts {
            for (s, c) in sum.iter_mut().zip(h) {
                *s += c;
            }
        }
        let triplets = sum.iter().sum();
        if triplets == 0 {
            log::warn!(
                "No bond angles within {:.3} Å; the distribution is empty",
                self.params.cutoff
            );
        }

        let partial = self
            .species
            .into_iter()
            .zip(&self.counts)
            .map(|(s, h)| (s, normalise(h)))
            .collect();

        Ok(BondAngleResult {
            angle,
            total: normalise(&sum),
            partial,
            triplets,
            frames: self.frames,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameSelection, Trajectory};
    use crate::pipeline;
    use crate::test_support::{b2, bcc, fcc};

    fn run_bad(frame: Frame, cutoff: f64, bins: usize) -> BondAngleResult {
        let analysis = BondAngleAnalysis::new(BondAngleParams { cutoff, bins }).unwrap();
        pipeline::run(&Trajectory::single(frame), &FrameSelection::default(), analysis, None).unwrap()
    }

    /// 包含给定角度的格中的概率
    fn mass_at(result: &BondAngleResult, theta: f64) -> f64 {
        let w = result.width();
        let k = ((theta / w) as usize).min(result.angle.len() - 1);
        result.total[k] * w
    }

    #[test]
    fn test_fcc_angles() {
        // 7.2° 格宽，使 60/90/120/180 都不落在格边界上
        let result = run_bad(fcc(4.05, 3, "Al"), 3.5, 25);
        assert_eq!(result.triplets, 108 * 66);
        assert!((mass_at(&result, 60.0) - 24.0 / 66.0).abs() < 1e-12);
        assert!((mass_at(&result, 90.0) - 12.0 / 66.0).abs() < 1e-12);
        assert!((mass_at(&result, 120.0) - 24.0 / 66.0).abs() < 1e-12);
        assert!((mass_at(&result, 180.0) - 6.0 / 66.0).abs() < 1e-12);

        let area: f64 = result.total.iter().sum::<f64>() * result.width();
        assert!((area - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bcc_angles() {
        // 只取第一近邻 (a√3/2 = 2.598)
        let result = run_bad(bcc(3.0, 4, "Fe"), 2.8, 25);
        // 8 个近邻：28 个键角 = 12 × 70.53° + 12 × 109.47° + 4 × 180°
        assert!((mass_at(&result, 70.53) - 12.0 / 28.0).abs() < 1e-12);
        assert!((mass_at(&result, 109.47) - 12.0 / 28.0).abs() < 1e-12);
        assert!((mass_at(&result, 180.0) - 4.0 / 28.0).abs() < 1e-12);
    }

    #[test]
    fn test_partials_per_centre() {
        let result = run_bad(b2(3.0, 3, "Ni", "Al"), 2.8, 18);
        assert_eq!(result.partial.len(), 2);
        for (_, p) in &result.partial {
            let area: f64 = p.iter().sum::<f64>() * result.width();
            assert!((area - 1.0).abs() < 1e-12);
            // 两种中心的环境相同
            assert_eq!(p, &result.total);
        }
    }

    #[test]
    fn test_angle_between() {
        assert!((angle_between(&[1.0, 0.0, 0.0], &[0.0, 2.0, 0.0]) - 90.0).abs() < 1e-12);
        assert!((angle_between(&[1.0, 0.0, 0.0], &[-3.0, 0.0, 0.0]) - 180.0).abs() < 1e-12);
        assert!(BondAngleAnalysis::new(BondAngleParams { cutoff: 3.0, bins: 0 }).is_err());
    }
}
