//! # 静态结构因子
//!
//! 由 g(r) 做 Fourier 变换得到 S(q)：
//!
//! S(q) = 1 + 4πρ ∫ r (g(r) − 1) sin(qr) / q dr   （r 网格上矩形积分）
//!
//! ## 总结构因子
//! - `direct`：直接变换总 g(r)
//! - `faber-ziman`：偏结构因子加权求和
//!   S(q) = Σ_{a≤b} w_ab(q) S_ab(q)，
//!   w_ab = (2 − δ_ab) c_a c_b f_a f_b / (Σ c_i f_i)²，
//!   f 为 X 射线形状因子 f(q) 或中子散射长度 b
//!
//! ## 依赖关系
//! - 被 `commands/analyze/sq.rs` 使用
//! - 使用 `analysis/scattering.rs`, `parsers/tables.rs`

use crate::analysis::scattering::{form_factor, neutron_length};
use crate::error::{MdlabError, Result};
use crate::parsers::tables::RdfTable;

use clap::ValueEnum;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 总结构因子计算方法
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SqMethod {
    /// Transform the total g(r)
    #[default]
    Direct,
    /// Weighted sum of partial S_ab(q)
    FaberZiman,
}

impl std::fmt::Display for SqMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqMethod::Direct => write!(f, "direct"),
            SqMethod::FaberZiman => write!(f, "faber-ziman"),
        }
    }
}

/// 散射源
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Radiation {
    /// X-ray atomic form factors f(q)
    #[default]
    Xray,
    /// Neutron coherent scattering lengths
    Neutron,
}

impl std::fmt::Display for Radiation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Radiation::Xray => write!(f, "x-ray"),
            Radiation::Neutron => write!(f, "neutron"),
        }
    }
}

/// q 网格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QGrid {
    pub q_min: f64,
    pub q_max: f64,
    pub points: usize,
}

impl Default for QGrid {
    fn default() -> Self {
        QGrid {
            q_min: 0.5,
            q_max: 20.0,
            points: 400,
        }
    }
}

impl QGrid {
    pub fn values(&self) -> Result<Vec<f64>> {
        if self.points < 2 || !(self.q_max > self.q_min) || self.q_min < 0.0 {
            return Err(MdlabError::InvalidArgument(format!(
                "Invalid q grid: {}..{} with {} points",
                self.q_min, self.q_max, self.points
            )));
        }
        let dq = (self.q_max - self.q_min) / (self.points - 1) as f64;
        Ok((0..self.points)
            .map(|i| self.q_min + i as f64 * dq)
            .collect())
    }
}

/// S(q) 结果
#[derive(Debug, Clone, Serialize)]
pub struct SqResult {
    pub q: Vec<f64>,
    /// 总 S(q)（仅偏结构因子时为 None）
    pub total: Option<Vec<f64>>,
    /// 原子对
    pub pairs: Vec<(String, String)>,
    /// 偏结构因子 S_ab(q)
    pub partial: Vec<Vec<f64>>,
    /// Faber-Ziman 权重 w_ab(q)（与 pairs 对应）
    pub weights: Vec<Vec<f64>>,
}

/// 单条 g(r) 的 Fourier 变换
pub fn transform(r: &[f64], g: &[f64], density: f64, q: &[f64]) -> Vec<f64> {
    let dr = if r.len() > 1 { r[1] - r[0] } else { 0.0 };
    let prefactor = 4.0 * PI * density * dr;

    q.par_iter()
        .map(|&qv| {
            let integral: f64 = r
                .iter()
                .zip(g)
                .map(|(&rv, &gv)| {
                    // q → 0 时 sin(qr)/q → r
                    let kernel = if qv.abs() < 1e-12 {
                        rv
                    } else {
                        (qv * rv).sin() / qv
                    };
                    rv * (gv - 1.0) * kernel
                })
                .sum();
            1.0 + prefactor * integral
        })
        .collect()
}

/// 各偏分布的 S_ab(q)
pub fn partial_structure_factors(table: &RdfTable, density: f64, grid: &QGrid) -> Result<SqResult> {
    let partials = table.partials();
    if partials.is_empty() {
        return Err(MdlabError::InvalidArgument(
            "Partial structure factors need partial g(r) columns named 'A-B'".to_string(),
        ));
    }
    let q = grid.values()?;
    let pairs = partials
        .iter()
        .map(|(a, b, _)| (a.clone(), b.clone()))
        .collect();
    let partial = partials
        .iter()
        .map(|(_, _, g)| transform(&table.r, g, density, &q))
        .collect();

    Ok(SqResult {
        q,
        total: None,
        pairs,
        partial,
        weights: Vec::new(),
    })
}

/// 总结构因子
pub fn total_structure_factor(
    table: &RdfTable,
    density: f64,
    grid: &QGrid,
    method: SqMethod,
    composition: &[(String, f64)],
    radiation: Radiation,
) -> Result<SqResult> {
    match method {
        SqMethod::Direct => {
            let total = table.total().ok_or_else(|| {
                MdlabError::InvalidArgument(
                    "The direct method needs a total g(r) column ('total'); \
                     use --method faber-ziman for partial-only tables"
                        .to_string(),
                )
            })?;
            let q = grid.values()?;
            let sq = transform(&table.r, total, density, &q);
            Ok(SqResult {
                q,
                total: Some(sq),
                pairs: Vec::new(),
                partial: Vec::new(),
                weights: Vec::new(),
            })
        }
        SqMethod::FaberZiman => {
            let mut result = partial_structure_factors(table, density, grid)?;
            let weights = faber_ziman_weights(&result.pairs, composition, radiation, &result.q)?;

            let mut total = vec![0.0; result.q.len()];
            for (w, s) in weights.iter().zip(&result.partial) {
                for ((t, wi), si) in total.iter_mut().zip(w).zip(s) {
                    *t += wi * si;
                }
            }
            result.total = Some(total);
            result.weights = weights;
            Ok(result)
        }
    }
}

/// Faber-Ziman 权重 `w[p][k]`
pub fn faber_ziman_weights(
    pairs: &[(String, String)],
    composition: &[(String, f64)],
    radiation: Radiation,
    q: &[f64],
) -> Result<Vec<Vec<f64>>> {
    let sum: f64 = composition.iter().map(|(_, c)| c).sum();
    if (sum - 1.0).abs() > 1e-3 {
        return Err(MdlabError::InvalidArgument(format!(
            "Compositions must sum to 1 (got {:.4})",
            sum
        )));
    }

    // 每个组分在各 q 处的散射强度
    let amplitudes: Vec<Vec<f64>> = composition
        .iter()
        .map(|(el, _)| match radiation {
            Radiation::Xray => {
                let params = form_factor(el)?;
                Ok(q.iter().map(|&qv| params.at_q(qv)).collect())
            }
            Radiation::Neutron => {
                let b = neutron_length(el)?;
                Ok(vec![b; q.len()])
            }
        })
        .collect::<Result<_>>()?;

    let index_of = |el: &str| -> Result<usize> {
        composition.iter().position(|(s, _)| s == el).ok_or_else(|| {
            MdlabError::InvalidArgument(format!("No composition given for element '{}'", el))
        })
    };

    // 所有组分对都必须有偏分布
    for (i, (a, _)) in composition.iter().enumerate() {
        for (b, _) in &composition[i..] {
            let present = pairs
                .iter()
                .any(|(x, y)| (x == a && y == b) || (x == b && y == a));
            if !present {
                return Err(MdlabError::AnalysisError(format!(
                    "Missing partial g(r) for pair {}-{}",
                    a, b
                )));
            }
        }
    }

    let mut weights = Vec::with_capacity(pairs.len());
    for (a, b) in pairs {
        let (ia, ib) = (index_of(a)?, index_of(b)?);
        let (ca, cb) = (composition[ia].1, composition[ib].1);
        let multiplicity = if ia == ib { 1.0 } else { 2.0 };
        let w: Vec<f64> = (0..q.len())
            .map(|k| {
                let mean: f64 = composition
                    .iter()
                    .zip(&amplitudes)
                    .map(|((_, c), f)| c * f[k])
                    .sum();
                multiplicity * ca * cb * amplitudes[ia][k] * amplitudes[ib][k] / (mean * mean)
            })
            .collect();
        weights.push(w);
    }

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hard_sphere_table(sigma: f64, columns: &[&str]) -> RdfTable {
        let dr = 0.001;
        let r: Vec<f64> = (0..15000).map(|k| (k as f64 + 0.5) * dr).collect();
        let g: Vec<f64> = r.iter().map(|&x| if x < sigma { 0.0 } else { 1.0 }).collect();
        RdfTable::new(
            r,
            columns.iter().map(|c| c.to_string()).collect(),
            vec![g; columns.len()],
        )
        .unwrap()
    }

    #[test]
    fn test_ideal_gas_is_one() {
        let r: Vec<f64> = (0..100).map(|k| 0.05 + k as f64 * 0.1).collect();
        let g = vec![1.0; 100];
        let sq = transform(&r, &g, 0.06, &[0.5, 1.0, 5.0]);
        for s in sq {
            assert!((s - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_step_function_matches_analytic() {
        let (sigma, rho) = (2.5, 0.05);
        let table = hard_sphere_table(sigma, &["total"]);
        let grid = QGrid {
            q_min: 1.0,
            q_max: 10.0,
            points: 10,
        };
        let result =
            total_structure_factor(&table, rho, &grid, SqMethod::Direct, &[], Radiation::Xray)
                .unwrap();
        let total = result.total.unwrap();
        for (q, s) in result.q.iter().zip(total) {
            let x = q * sigma;
            let exact = 1.0 - 4.0 * PI * rho * (x.sin() - x * x.cos()) / q.powi(3);
            assert!((s - exact).abs() < 1e-2, "q = {}: {} vs {}", q, s, exact);
        }
    }

    #[test]
    fn test_faber_ziman_weights_sum_to_one() {
        let pairs = vec![
            ("Al".to_string(), "Al".to_string()),
            ("Al".to_string(), "Sm".to_string()),
            ("Sm".to_string(), "Sm".to_string()),
        ];
        let comp = vec![("Al".to_string(), 0.9), ("Sm".to_string(), 0.1)];
        let q = vec![0.5, 2.5, 10.0];
        for radiation in [Radiation::Xray, Radiation::Neutron] {
            let w = faber_ziman_weights(&pairs, &comp, radiation, &q).unwrap();
            for k in 0..q.len() {
                let sum: f64 = w.iter().map(|wp| wp[k]).sum();
                assert!((sum - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_faber_ziman_equal_partials() {
        let table = hard_sphere_table(2.5, &["Al-Al", "Al-Sm", "Sm-Sm"]);
        let comp = vec![("Al".to_string(), 0.9), ("Sm".to_string(), 0.1)];
        let grid = QGrid::default();
        let fz = total_structure_factor(&table, 0.05, &grid, SqMethod::FaberZiman, &comp, Radiation::Xray)
            .unwrap();
        let direct = transform(&table.r, &table.values[0], 0.05, &fz.q);
        for (a, b) in fz.total.unwrap().iter().zip(direct) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_default_method_is_direct() {
        assert_eq!(SqMethod::default(), SqMethod::Direct);
        let table = hard_sphere_table(2.5, &["total"]);
        let result = total_structure_factor(
            &table,
            0.05,
            &QGrid::default(),
            SqMethod::default(),
            &[],
            Radiation::default(),
        )
        .unwrap();
        assert!(result.weights.is_empty());
        assert_eq!(result.total.unwrap().len(), 400);
    }

    #[test]
    fn test_errors() {
        let partial_only = hard_sphere_table(2.5, &["Al-Al", "Al-Sm", "Sm-Sm"]);
        let grid = QGrid::default();
        assert!(total_structure_factor(&partial_only, 0.05, &grid, SqMethod::Direct, &[], Radiation::Xray).is_err());

        let bad_comp = vec![("Al".to_string(), 0.8), ("Sm".to_string(), 0.1)];
        assert!(total_structure_factor(&partial_only, 0.05, &grid, SqMethod::FaberZiman, &bad_comp, Radiation::Xray).is_err());

        let total_only = hard_sphere_table(2.5, &["total"]);
        let comp = vec![("Al".to_string(), 1.0)];
        assert!(total_structure_factor(&total_only, 0.05, &grid, SqMethod::FaberZiman, &comp, Radiation::Xray).is_err());

        let missing = hard_sphere_table(2.5, &["Al-Al", "Sm-Sm"]);
        let comp = vec![("Al".to_string(), 0.9), ("Sm".to_string(), 0.1)];
        assert!(total_structure_factor(&missing, 0.05, &grid, SqMethod::FaberZiman, &comp, Radiation::Neutron).is_err());
    }
}
