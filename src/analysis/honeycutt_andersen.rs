//! # Honeycutt-Andersen 键对分析
//!
//! 对每一对原子 (i, j)：
//! - 第一位：1 = 成键（距离 < 截断），2 = 不成键（截断 ≤ 距离 < 第二截断）
//! - 第二位：同时与 i、j 成键的公共近邻数
//! - 第三位：公共近邻之间的键数
//! - 第四位：区分前三位相同的不同排布，由公共近邻键的最长连续链长度查表得到
//!
//! | 三元组 (公共近邻, 键, 最长链) | 指数 |
//! |---|---|
//! | (5,5,5) | 1551 |
//! | (5,4,4) | 1541 |
//! | (5,3,3) / (5,3,2) | 1531 / 1532 |
//! | (4,3,3) | 1431 |
//! | (4,2,1) / (4,2,2) | 1421 / 1422 |
//! | (6,6,6) | 1661 |
//! | (4,4,4) | 1441 |
//! | (3,1,1) / (3,2,2) / (3,0,0) | 1311 / 1321 / 1301 |
//! | (2,0,0) / (2,1,1) | 1201 / 1211 |
//!
//! 表外的排布第四位取 1。
//!
//! 公共近邻按几何判断（使用近邻矢量），因此在小盒子中同一原子的不同镜像会被分别计数。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/ha.rs` 使用
//! - 使用 `neighbors.rs`, `pipeline.rs`

use crate::error::{MdlabError, Result};
use crate::models::{norm, Frame};
use crate::neighbors::{Neighbor, NeighborList};
use crate::pipeline::FrameAnalysis;

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// HA 指数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HaSignature {
    pub bonded: bool,
    /// 公共近邻数
    pub common: usize,
    /// 公共近邻之间的键数
    pub bonds: usize,
    /// 排布标记
    pub arrangement: usize,
}

impl std::fmt::Display for HaSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}{}",
            if self.bonded { 1 } else { 2 },
            self.common,
            self.bonds,
            self.arrangement
        )
    }
}

/// 公共近邻分析三元组 (公共近邻数, 键数, 最长链)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CnaTriplet {
    pub common: usize,
    pub bonds: usize,
    pub chain: usize,
}

impl std::fmt::Display for CnaTriplet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.common, self.bonds, self.chain)
    }
}

impl CnaTriplet {
    /// 查表得到第四位
    pub fn arrangement(&self) -> usize {
        match (self.common, self.bonds, self.chain) {
            (5, 3, 2) | (4, 2, 2) => 2,
            _ => 1,
        }
    }

    pub fn signature(&self, bonded: bool) -> HaSignature {
        HaSignature {
            bonded,
            common: self.common,
            bonds: self.bonds,
            arrangement: self.arrangement(),
        }
    }
}

/// HA 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HaParams {
    /// 成键截断 (Å)
    pub cutoff: f64,
    /// 不成键键对的外截断 (Å)；None 表示只分析成键对
    pub unbonded_cutoff: Option<f64>,
}

/// 多帧统计结果
#[derive(Debug, Clone, Serialize)]
pub struct HaSummary {
    /// 按出现次数降序
    pub signatures: Vec<(HaSignature, usize)>,
    pub triplets: Vec<(CnaTriplet, usize)>,
    pub pairs: usize,
    pub frames: usize,
}

impl HaSummary {
    /// 某指数所占比例
    pub fn fraction(&self, signature: &str) -> f64 {
        if self.pairs == 0 {
            return 0.0;
        }
        self.signatures
            .iter()
            .filter(|(s, _)| s.to_string() == signature)
            .map(|(_, n)| *n)
            .sum::<usize>() as f64
            / self.pairs as f64
    }
}

/// 公共近邻键组成的图中，不重复使用边的最长路径长度
pub fn longest_chain(nodes: usize, edges: &[(usize, usize)]) -> usize {
    let mut adjacency = vec![Vec::new(); nodes];
    for (e, &(a, b)) in edges.iter().enumerate() {
        adjacency[a].push((b, e));
        adjacency[b].push((a, e));
    }

    fn walk(node: usize, adjacency: &[Vec<(usize, usize)>], used: &mut [bool]) -> usize {
        let mut best = 0;
        for &(next, e) in &adjacency[node] {
            if !used[e] {
                used[e] = true;
                best = best.max(1 + walk(next, adjacency, used));
                used[e] = false;
            }
        }
        best
    }

    let mut used = vec![false; edges.len()];
    (0..nodes)
        .map(|start| walk(start, &adjacency, &mut used))
        .max()
        .unwrap_or(0)
}

/// 一个键对的公共近邻三元组
///
/// `shell` 为 i 的成键近邻，`pair` 为 j 的镜像
fn pair_triplet(shell: &[Neighbor], pair: &Neighbor, cutoff: f64) -> CnaTriplet {
    let common: Vec<&Neighbor> = shell
        .iter()
        .filter(|k| !(k.index == pair.index && same_vector(&k.vector, &pair.vector)))
        .filter(|k| distance(&k.vector, &pair.vector) < cutoff)
        .collect();

    let mut edges = Vec::new();
    for a in 0..common.len() {
        for b in a + 1..common.len() {
            if distance(&common[a].vector, &common[b].vector) < cutoff {
                edges.push((a, b));
            }
        }
    }

    CnaTriplet {
        common: common.len(),
        bonds: edges.len(),
        chain: longest_chain(common.len(), &edges),
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    norm(&[a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}

fn same_vector(a: &[f64; 3], b: &[f64; 3]) -> bool {
    distance(a, b) < 1e-8
}

/// 一帧中所有键对的 (成键, 三元组)
pub fn classify_pairs(neighbors: &NeighborList, params: &HaParams) -> Vec<(bool, CnaTriplet)> {
    let outer = params.unbonded_cutoff.unwrap_or(params.cutoff);
    (0..neighbors.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let shell = neighbors.within(i, params.cutoff);
            neighbors
                .within(i, outer)
                .iter()
                // 每个无序键对只计一次
                .filter(move |n| n.index > i)
                .map(move |n| (n.distance < params.cutoff, pair_triplet(shell, n, params.cutoff)))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// 逐帧累积的 HA 分析
#[derive(Debug, Clone)]
pub struct HaAnalysis {
    params: HaParams,
    signatures: HashMap<HaSignature, usize>,
    triplets: HashMap<CnaTriplet, usize>,
    pairs: usize,
    frames: usize,
}

impl HaAnalysis {
    pub fn new(params: HaParams) -> Result<Self> {
        if !(params.cutoff > 0.0) {
            return Err(MdlabError::InvalidArgument(format!(
                "HA cutoff must be positive, got {}",
                params.cutoff
            )));
        }
        if let Some(outer) = params.unbonded_cutoff {
            if outer <= params.cutoff {
                return Err(MdlabError::InvalidArgument(format!(
                    "Unbonded cutoff ({}) must exceed the bond cutoff ({})",
                    outer, params.cutoff
                )));
            }
        }
        Ok(HaAnalysis {
            params,
            signatures: HashMap::new(),
            triplets: HashMap::new(),
            pairs: 0,
            frames: 0,
        })
    }
}

impl FrameAnalysis for HaAnalysis {
    type Output = HaSummary;

    fn name(&self) -> &str {
        "honeycutt-andersen"
    }

    fn cutoff(&self) -> f64 {
        self.params.unbonded_cutoff.unwrap_or(self.params.cutoff)
    }

    fn accumulate(&mut self, _frame: &Frame, neighbors: &NeighborList) -> Result<()> {
        for (bonded, triplet) in classify_pairs(neighbors, &self.params) {
            *self.signatures.entry(triplet.signature(bonded)).or_insert(0) += 1;
            if bonded {
                *self.triplets.entry(triplet).or_insert(0) += 1;
            }
            self.pairs += 1;
        }
        self.frames += 1;
        Ok(())
    }

    fn finish(self) -> Result<HaSummary> {
        let mut signatures: Vec<_> = self.signatures.into_iter().collect();
        signatures.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let mut triplets: Vec<_> = self.triplets.into_iter().collect();
        triplets.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(HaSummary {
            signatures,
            triplets,
            pairs: self.pairs,
            frames: self.frames,
        })
    }
}
