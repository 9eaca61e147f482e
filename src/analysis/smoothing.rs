//! # Savitzky-Golay 平滑
//!
//! 在长度为 window 的滑动窗口内做 order 阶多项式最小二乘拟合，取拟合值。
//! 两端的点使用向内平移的同一窗口（不做镜像填充）。
//!
//! ## 依赖关系
//! - 被 `analysis/rdf.rs` 使用
//! - 使用 `nalgebra` 计算 Vandermonde 矩阵的伪逆

use crate::error::{MdlabError, Result};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// 平滑参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavitzkyGolay {
    /// 窗口长度（奇数）
    pub window: usize,
    /// 多项式阶数
    pub order: usize,
}

impl Default for SavitzkyGolay {
    fn default() -> Self {
        SavitzkyGolay {
            window: 7,
            order: 3,
        }
    }
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Result<Self> {
        if window % 2 == 0 {
            return Err(MdlabError::InvalidArgument(format!(
                "Savitzky-Golay window must be odd, got {}",
                window
            )));
        }
        if window < order + 2 {
            return Err(MdlabError::InvalidArgument(format!(
                "Savitzky-Golay window ({}) must be at least polynomial order + 2 ({})",
                window,
                order + 2
            )));
        }
        Ok(SavitzkyGolay { window, order })
    }

    /// 平滑一条曲线
    pub fn apply(&self, y: &[f64]) -> Result<Vec<f64>> {
        let n = y.len();
        let w = self.window;
        if n < w {
            return Err(MdlabError::InvalidArgument(format!(
                "Cannot smooth {} points with a window of {}",
                n, w
            )));
        }

        let half = (w / 2) as f64;
        let vander = DMatrix::from_fn(w, self.order + 1, |r, c| (r as f64 - half).powi(c as i32));
        // 伪逆第 j 行给出窗口内数据到第 j 个多项式系数的线性映射
        let pinv = vander
            .pseudo_inverse(1e-12)
            .map_err(|e| MdlabError::AnalysisError(format!("Savitzky-Golay fit failed: {}", e)))?;

        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let start = i.saturating_sub(w / 2).min(n - w);
            let window = &y[start..start + w];
            // 目标点相对窗口中心的偏移，内部点为 0
            let t = i as f64 - start as f64 - half;

            let mut value = 0.0;
            let mut t_pow = 1.0;
            for j in 0..=self.order {
                let coeff: f64 = pinv
                    .row(j)
                    .iter()
                    .zip(window)
                    .map(|(p, v)| p * v)
                    .sum();
                value += coeff * t_pow;
                t_pow *= t;
            }
            out.push(value);
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_is_preserved() {
        // 阶数 ≥ 多项式次数时，包括端点在内都应精确还原
        let y: Vec<f64> = (0..20)
            .map(|i| {
                let x = i as f64 * 0.1;
                1.0 - 2.0 * x + 0.5 * x * x * x
            })
            .collect();
        let sg = SavitzkyGolay::new(7, 3).unwrap();
        let smoothed = sg.apply(&y).unwrap();
        for (a, b) in y.iter().zip(&smoothed) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn test_noise_is_reduced() {
        let y: Vec<f64> = (0..50).map(|i| if i % 2 == 0 { 1.1 } else { 0.9 }).collect();
        let smoothed = SavitzkyGolay::new(9, 2).unwrap().apply(&y).unwrap();
        let dev: f64 = smoothed[5..45].iter().map(|v| (v - 1.0).abs()).fold(0.0, f64::max);
        assert!(dev < 0.05, "max deviation {}", dev);
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(SavitzkyGolay::new(6, 2).is_err());
        assert!(SavitzkyGolay::new(3, 2).is_err());
        let sg = SavitzkyGolay::new(5, 2).unwrap();
        assert!(sg.apply(&[1.0, 2.0, 3.0]).is_err());
    }
}
