//! # 径向分布函数
//!
//! 偏径向分布函数 g_ab(r)、总 g(r) 与累积配位数。
//!
//! ## 公式
//! - g_ab(r) = V · n_ab(r) / (N_a · N_b · ΔV_shell)，n_ab 统计有序原子对（a 为中心）
//! - g(r) = Σ_a Σ_b c_a c_b g_ab(r)
//! - CN_ab(r) = 4πρ c_b ∫₀ʳ g_ab(r') r'² dr'
//!
//! 原子对按元素顺序的有重复组合排列：Al-Al, Al-Sm, Sm-Sm。
//! 每帧单独归一化（体积可变），再对帧取平均。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/rdf.rs`, `analysis/structure_factor.rs` 使用
//! - 使用 `pipeline.rs`, `analysis/smoothing.rs`, `parsers/tables.rs`

use crate::analysis::smoothing::SavitzkyGolay;
use crate::error::{MdlabError, Result};
use crate::models::Frame;
use crate::neighbors::NeighborList;
use crate::parsers::tables::RdfTable;
use crate::pipeline::FrameAnalysis;

use serde::Serialize;
use std::f64::consts::PI;

/// RDF 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RdfParams {
    /// 最大距离 (Å)
    pub cutoff: f64,
    /// 直方图格子数
    pub bins: usize,
    /// 可选平滑
    pub smoothing: Option<SavitzkyGolay>,
}

impl Default for RdfParams {
    fn default() -> Self {
        RdfParams {
            cutoff: 8.0,
            bins: 100,
            smoothing: Some(SavitzkyGolay::default()),
        }
    }
}

/// RDF 计算结果
#[derive(Debug, Clone, Serialize)]
pub struct RdfResult {
    /// 格子中心 (Å)
    pub r: Vec<f64>,
    /// 元素顺序
    pub species: Vec<String>,
    /// 摩尔分数（与 species 对应）
    pub composition: Vec<f64>,
    /// 原子对 (a, b)
    pub pairs: Vec<(String, String)>,
    /// `partial[p][k]` 为第 p 对在 r[k] 处的 g
    pub partial: Vec<Vec<f64>>,
    /// 总 g(r)
    pub total: Vec<f64>,
    /// 累积配位数：a 周围 b 原子数
    pub coordination: Vec<Vec<f64>>,
    /// 平均数密度 (atoms/Å³)
    pub density: f64,
    /// 参与平均的帧数
    pub frames: usize,
}

impl RdfResult {
    pub fn dr(&self) -> f64 {
        if self.r.len() > 1 {
            self.r[1] - self.r[0]
        } else {
            0.0
        }
    }

    /// 原子对下标（顺序无关）
    pub fn pair_index(&self, a: &str, b: &str) -> Option<usize> {
        self.pairs
            .iter()
            .position(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// 总 g(r) 的第一极小值位置
    pub fn first_minimum(&self) -> Option<f64> {
        first_minimum(&self.r, &self.total)
    }

    /// r 处的累积配位数（a 周围 b 原子数）
    pub fn coordination_at(&self, a: &str, b: &str, r: f64) -> Option<f64> {
        let ia = self.species.iter().position(|s| s == a)?;
        let ib = self.species.iter().position(|s| s == b)?;
        let p = self.pair_index(a, b)?;
        let k = ((r / self.dr()) as usize).min(self.r.len().checked_sub(1)?);
        let cn = self.coordination[p][k];
        if ia == ib {
            return Some(cn);
        }
        // 配位数按 "第一个元素为中心" 存储，反向时按组成换算
        let (first, _) = &self.pairs[p];
        if first == a {
            Some(cn)
        } else {
            Some(cn * self.composition[ib] / self.composition[ia])
        }
    }

    /// 转为表格（total + 各偏分布）
    pub fn to_table(&self) -> Result<RdfTable> {
        let mut columns = vec!["total".to_string()];
        let mut values = vec![self.total.clone()];
        for ((a, b), g) in self.pairs.iter().zip(&self.partial) {
            columns.push(format!("{}-{}", a, b));
            values.push(g.clone());
        }
        RdfTable::new(self.r.clone(), columns, values)
    }
}

/// 逐帧累积的 RDF 分析
#[derive(Debug, Clone)]
pub struct RdfAnalysis {
    params: RdfParams,
    species: Vec<String>,
    composition: Vec<f64>,
    /// 每对的 g 之和（各帧已归一化）
    sums: Vec<Vec<f64>>,
    density_sum: f64,
    frames: usize,
}

impl RdfAnalysis {
    /// `species` 为空时使用第一帧中的元素顺序
    pub fn new(params: RdfParams, species: Vec<String>) -> Result<Self> {
        if !(params.cutoff > 0.0) {
            return Err(MdlabError::InvalidArgument(format!(
                "RDF cutoff must be positive, got {}",
                params.cutoff
            )));
        }
        if params.bins < 2 {
            return Err(MdlabError::InvalidArgument(
                "RDF needs at least 2 bins".to_string(),
            ));
        }
        Ok(RdfAnalysis {
            params,
            species,
            composition: Vec::new(),
            sums: Vec::new(),
            density_sum: 0.0,
            frames: 0,
        })
    }

    fn pairs(&self) -> Vec<(usize, usize)> {
        let n = self.species.len();
        (0..n).flat_map(|a| (a..n).map(move |b| (a, b))).collect()
    }

    fn shell_volume(&self, k: usize) -> f64 {
        let dr = self.params.cutoff / self.params.bins as f64;
        let lo = k as f64 * dr;
        let hi = lo + dr;
        4.0 / 3.0 * PI * (hi.powi(3) - lo.powi(3))
    }
}

impl FrameAnalysis for RdfAnalysis {
    type Output = RdfResult;

    fn name(&self) -> &str {
        "rdf"
    }

    fn cutoff(&self) -> f64 {
        self.params.cutoff
    }

    fn accumulate(&mut self, frame: &Frame, neighbors: &NeighborList) -> Result<()> {
        if self.species.is_empty() {
            self.species = frame.species();
        }
        let ns = self.species.len();
        let types = frame.species_indices(&self.species);
        if let Some(pos) = types.iter().position(|&t| t == usize::MAX) {
            return Err(MdlabError::AnalysisError(format!(
                "Frame '{}' contains element '{}' not in {:?}",
                frame.name, frame.atoms[pos].element, self.species
            )));
        }

        let mut counts = vec![0usize; ns];
        for &t in &types {
            counts[t] += 1;
        }
        if self.frames == 0 {
            let n = frame.len().max(1) as f64;
            self.composition = counts.iter().map(|&c| c as f64 / n).collect();
            self.sums = vec![vec![0.0; self.params.bins]; self.pairs().len()];
        }

        // 有序对直方图 hist[a][b][k]：中心为 a、近邻为 b
        let bins = self.params.bins;
        let dr = self.params.cutoff / bins as f64;
        let mut hist = vec![vec![vec![0usize; bins]; ns]; ns];
        for (i, &ti) in types.iter().enumerate() {
            for n in neighbors.neighbors(i) {
                let k = (n.distance / dr) as usize;
                if k < bins {
                    hist[ti][types[n.index]][k] += 1;
                }
            }
        }

        let volume = frame.lattice.volume().abs();
        for (p, (a, b)) in self.pairs().into_iter().enumerate() {
            let norm = (counts[a] * counts[b]) as f64;
            if norm == 0.0 {
                continue;
            }
            for k in 0..bins {
                self.sums[p][k] += volume * hist[a][b][k] as f64 / (norm * self.shell_volume(k));
            }
        }

        self.density_sum += frame.number_density();
        self.frames += 1;
        Ok(())
    }

    fn finish(self) -> Result<RdfResult> {
        if self.frames == 0 {
            return Err(MdlabError::EmptySelection { frames: 0 });
        }
        let bins = self.params.bins;
        let dr = self.params.cutoff / bins as f64;
        let r: Vec<f64> = (0..bins).map(|k| (k as f64 + 0.5) * dr).collect();
        let density = self.density_sum / self.frames as f64;
        let pairs = self.pairs();

        let raw: Vec<Vec<f64>> = self
            .sums
            .iter()
            .map(|s| s.iter().map(|v| v / self.frames as f64).collect())
            .collect();

        // 配位数用未平滑的 g，在壳层上精确积分
        let coordination: Vec<Vec<f64>> = pairs
            .iter()
            .zip(&raw)
            .map(|(&(_, b), g)| {
                let mut acc = 0.0;
                g.iter()
                    .enumerate()
                    .map(|(k, gk)| {
                        acc += density * self.composition[b] * gk * self.shell_volume(k);
                        acc
                    })
                    .collect()
            })
            .collect();

        let partial = match self.params.smoothing {
            Some(sg) => raw.iter().map(|g| sg.apply(g)).collect::<Result<Vec<_>>>()?,
            None => raw,
        };

        let mut total = vec![0.0; bins];
        for (&(a, b), g) in pairs.iter().zip(&partial) {
            let multiplicity = if a == b { 1.0 } else { 2.0 };
            let weight = multiplicity * self.composition[a] * self.composition[b];
            for (t, v) in total.iter_mut().zip(g) {
                *t += weight * v;
            }
        }

        Ok(RdfResult {
            r,
            pairs: pairs
                .iter()
                .map(|&(a, b)| (self.species[a].clone(), self.species[b].clone()))
                .collect(),
            species: self.species,
            composition: self.composition,
            partial,
            total,
            coordination,
            density,
            frames: self.frames,
        })
    }
}

/// 第一峰之后的第一个极小值（平台取其末端）
pub fn first_minimum(r: &[f64], g: &[f64]) -> Option<f64> {
    let peak = g
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, _)| i)?;
    (peak + 1..g.len().saturating_sub(1))
        .find(|&k| g[k] <= g[k - 1] && g[k + 1] > g[k])
        .map(|k| r[k])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameSelection, Trajectory};
    use crate::pipeline;
    use crate::test_support::{b2, fcc, random_frame};

    fn compute(frame: crate::models::Frame, params: RdfParams) -> RdfResult {
        let traj = Trajectory::single(frame);
        let analysis = RdfAnalysis::new(params, Vec::new()).unwrap();
        pipeline::run(&traj, &FrameSelection::default(), analysis, None).unwrap()
    }

    #[test]
    fn test_ideal_gas_is_flat() {
        let params = RdfParams {
            cutoff: 5.0,
            bins: 50,
            smoothing: None,
        };
        let result = compute(random_frame(1000, 16.0, &["Ar"], 3), params);
        let tail: Vec<f64> = result.total[20..].to_vec();
        let mean = tail.iter().sum::<f64>() / tail.len() as f64;
        assert!((mean - 1.0).abs() < 0.05, "mean g = {}", mean);
    }

    #[test]
    fn test_fcc_first_shell() {
        let params = RdfParams {
            cutoff: 5.0,
            bins: 125,
            smoothing: None,
        };
        let result = compute(fcc(4.05, 4, "Al"), params);
        assert_eq!(result.pairs, vec![("Al".to_string(), "Al".to_string())]);

        // 第一峰位于 a/√2
        let peak = result
            .total
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| result.r[i])
            .unwrap();
        assert!((peak - 4.05 / 2f64.sqrt()).abs() < 0.04);

        let rmin = result.first_minimum().unwrap();
        assert!(rmin > 2.9 && rmin < 4.05, "first minimum {}", rmin);
        let cn = result.coordination_at("Al", "Al", rmin).unwrap();
        assert!((cn - 12.0).abs() < 1e-9, "CN = {}", cn);
    }

    #[test]
    fn test_binary_pairs_and_coordination() {
        let params = RdfParams {
            cutoff: 4.0,
            bins: 100,
            smoothing: None,
        };
        let result = compute(b2(3.0, 4, "Ni", "Al"), params);
        assert_eq!(result.species, vec!["Ni".to_string(), "Al".to_string()]);
        assert_eq!(result.pairs.len(), 3);
        assert_eq!(result.pairs[1], ("Ni".to_string(), "Al".to_string()));
        assert!((result.composition[0] - 0.5).abs() < 1e-12);

        // 第一壳层 (√3/2 a ≈ 2.60) 全为异类原子，第二壳层 (a) 全为同类
        assert!((result.coordination_at("Ni", "Al", 2.8).unwrap() - 8.0).abs() < 1e-9);
        assert!((result.coordination_at("Al", "Ni", 2.8).unwrap() - 8.0).abs() < 1e-9);
        assert!(result.coordination_at("Ni", "Ni", 2.8).unwrap().abs() < 1e-9);
        assert!((result.coordination_at("Ni", "Ni", 3.2).unwrap() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_keeps_shape() {
        let result = compute(random_frame(500, 12.0, &["Al", "Sm"], 5), RdfParams {
            cutoff: 4.0,
            bins: 40,
            smoothing: Some(SavitzkyGolay::default()),
        });
        assert_eq!(result.total.len(), 40);
        let table = result.to_table().unwrap();
        assert_eq!(table.columns, vec!["total", "Al-Al", "Al-Sm", "Sm-Sm"]);
    }

    #[test]
    fn test_first_minimum_plateau() {
        let r: Vec<f64> = (0..8).map(|k| k as f64).collect();
        let g = vec![0.0, 3.0, 1.0, 0.5, 0.5, 0.8, 1.0, 1.0];
        assert_eq!(first_minimum(&r, &g), Some(4.0));
    }

    #[test]
    fn test_invalid_params() {
        let p = RdfParams {
            cutoff: 0.0,
            ..Default::default()
        };
        assert!(RdfAnalysis::new(p, Vec::new()).is_err());
    }
}
