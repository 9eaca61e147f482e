//! # 状态方程拟合
//!
//! 三阶 Birch-Murnaghan 状态方程：
//!
//! E(V) = E0 + 9 V0 B0 / 16 · { [(V0/V)^(2/3) − 1]³ B0′ + [(V0/V)^(2/3) − 1]² [6 − 4 (V0/V)^(2/3)] }
//!
//! 该式是 x = V^(−2/3) 的三次多项式，因此先对 E(x) 做线性最小二乘，
//! 再由多项式求出 V0、E0、B0、B0′。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/eos.rs` 使用
//! - 使用 `nalgebra` SVD 求解最小二乘
//! - 使用 `models/energetics.rs`

use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

/// eV/Å³ → GPa
pub const EV_PER_A3_TO_GPA: f64 = 160.217_662_08;

/// 拟合参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BirchMurnaghan {
    /// 平衡能量 (eV)
    pub e0: f64,
    /// 平衡体积 (Å³)
    pub v0: f64,
    /// 体弹模量 (eV/Å³)
    pub b0: f64,
    /// 体弹模量对压力的导数
    pub b0_prime: f64,
}

impl BirchMurnaghan {
    /// 体弹模量 (GPa)
    pub fn b0_gpa(&self) -> f64 {
        self.b0 * EV_PER_A3_TO_GPA
    }

    /// E(V) (eV)
    pub fn energy(&self, v: f64) -> f64 {
        let eta = (self.v0 / v).powf(2.0 / 3.0) - 1.0;
        self.e0
            + 9.0 * self.v0 * self.b0 / 16.0
                * (eta.powi(3) * self.b0_prime + eta.powi(2) * (6.0 - 4.0 * (eta + 1.0)))
    }

    /// P(V) = −dE/dV (eV/Å³)
    pub fn pressure(&self, v: f64) -> f64 {
        let r = self.v0 / v;
        let r73 = r.powf(7.0 / 3.0);
        let r53 = r.powf(5.0 / 3.0);
        let r23 = r.powf(2.0 / 3.0);
        1.5 * self.b0 * (r73 - r53) * (1.0 + 0.75 * (self.b0_prime - 4.0) * (r23 - 1.0))
    }
}

/// 拟合结果
#[derive(Debug, Clone, Serialize)]
pub struct EosFit {
    pub params: BirchMurnaghan,
    /// E(x) 多项式系数 [a, b, c, d]，x = V^(−2/3)
    pub coefficients: [f64; 4],
    /// 残差均方根 (eV)
    pub rms: f64,
    /// 拟合使用的点数
    pub points: usize,
}

/// 便捷函数：按参数计算 E(V)
pub fn birch_murnaghan_energy(v: f64, params: &BirchMurnaghan) -> f64 {
    params.energy(v)
}

/// 便捷函数：按参数计算 P(V) (eV/Å³)
pub fn pressure(v: f64, params: &BirchMurnaghan) -> f64 {
    params.pressure(v)
}

/// 三阶 Birch-Murnaghan 拟合
pub fn fit_birch_murnaghan(points: &[EnergyPoint]) -> Result<EosFit> {
    if let Some(p) = points.iter().find(|p| !(p.volume > 0.0) || !p.energy.is_finite()) {
        return Err(MdlabError::FitError(format!(
            "Invalid data point '{}' (V = {}, E = {})",
            p.label, p.volume, p.energy
        )));
    }

    let mut volumes: Vec<f64> = points.iter().map(|p| p.volume).collect();
    volumes.sort_by(f64::total_cmp);
    volumes.dedup_by(|a, b| (*a - *b).abs() < 1e-8 * b.abs());
    if volumes.len() < 4 {
        return Err(MdlabError::FitError(format!(
            "Need at least 4 distinct volumes, got {}",
            volumes.len()
        )));
    }

    let n = points.len();
    let x: Vec<f64> = points.iter().map(|p| p.volume.powf(-2.0 / 3.0)).collect();

    // 以均值为中心缩放，改善 Vandermonde 条件数
    let x_mean = x.iter().sum::<f64>() / n as f64;
    let x_scale = x
        .iter()
        .map(|v| (v - x_mean).abs())
        .fold(0.0, f64::max)
        .max(f64::MIN_POSITIVE);
    let design = DMatrix::from_fn(n, 4, |r, c| ((x[r] - x_mean) / x_scale).powi(c as i32));
    let rhs = DVector::from_iterator(n, points.iter().map(|p| p.energy));

    let svd = design.clone().svd(true, true);
    let scaled = svd
        .solve(&rhs, 1e-14)
        .map_err(|e| MdlabError::FitError(format!("Least squares failed: {}", e)))?;

    let residual = &design * &scaled - &rhs;
    let rms = (residual.norm_squared() / n as f64).sqrt();

    let coefficients = unscale([scaled[0], scaled[1], scaled[2], scaled[3]], x_mean, x_scale);
    let params = params_from_polynomial(&coefficients, &volumes)?;

    log::debug!(
        "EOS fit: V0 = {:.4}, E0 = {:.6}, B0 = {:.2} GPa, B0' = {:.3}, rms = {:.2e}",
        params.v0,
        params.e0,
        params.b0_gpa(),
        params.b0_prime,
        rms
    );

    Ok(EosFit {
        params,
        coefficients,
        rms,
        points: n,
    })
}

/// 由 t = (x − m)/s 的系数还原为 x 的系数
fn unscale(c: [f64; 4], m: f64, s: f64) -> [f64; 4] {
    let (c0, c1, c2, c3) = (c[0], c[1] / s, c[2] / (s * s), c[3] / (s * s * s));
    [
        c0 - c1 * m + c2 * m * m - c3 * m * m * m,
        c1 - 2.0 * c2 * m + 3.0 * c3 * m * m,
        c2 - 3.0 * c3 * m,
        c3,
    ]
}

fn params_from_polynomial(c: &[f64; 4], volumes: &[f64]) -> Result<BirchMurnaghan> {
    let [a, b, cc, d] = *c;
    let e = |x: f64| a + b * x + cc * x * x + d * x * x * x;
    let ex = |x: f64| b + 2.0 * cc * x + 3.0 * d * x * x;
    let exx = |x: f64| 2.0 * cc + 6.0 * d * x;
    let exxx = 6.0 * d;

    // dE/dx = 0 的根中取曲率为正者
    let roots: Vec<f64> = if d.abs() < 1e-300 {
        if cc.abs() < 1e-300 {
            Vec::new()
        } else {
            vec![-b / (2.0 * cc)]
        }
    } else {
        let disc = 4.0 * cc * cc - 12.0 * b * d;
        if disc < 0.0 {
            Vec::new()
        } else {
            let sq = disc.sqrt();
            vec![(-2.0 * cc + sq) / (6.0 * d), (-2.0 * cc - sq) / (6.0 * d)]
        }
    };

    let v_min = volumes.first().copied().unwrap_or(0.0);
    let v_max = volumes.last().copied().unwrap_or(0.0);
    let x0 = roots
        .into_iter()
        .filter(|&x| x > 0.0 && exx(x) > 0.0)
        // 多个候选时取离数据中心最近的
        .min_by(|p, q| {
            let mid = (v_min * v_max).sqrt().powf(-2.0 / 3.0);
            (p - mid).abs().total_cmp(&(q - mid).abs())
        })
        .ok_or_else(|| MdlabError::FitError("E(V) has no minimum; check the data".to_string()))?;

    let v0 = x0.powf(-1.5);
    if v0 < 0.5 * v_min || v0 > 2.0 * v_max {
        log::warn!(
            "EOS minimum V0 = {:.3} lies far outside the data range [{:.3}, {:.3}]",
            v0,
            v_min,
            v_max
        );
    }

    // 链式法则：x = V^(−2/3)
    let x_v = -2.0 / 3.0 * v0.powf(-5.0 / 3.0);
    let x_vv = 10.0 / 9.0 * v0.powf(-8.0 / 3.0);
    let x_vvv = -80.0 / 27.0 * v0.powf(-11.0 / 3.0);

    let e_vv = exx(x0) * x_v * x_v + ex(x0) * x_vv;
    let e_vvv = exxx * x_v.powi(3) + 3.0 * exx(x0) * x_v * x_vv + ex(x0) * x_vvv;

    let b0 = v0 * e_vv;
    if !(b0 > 0.0) {
        return Err(MdlabError::FitError(format!(
            "Non-positive bulk modulus ({:.4e} eV/Å³)",
            b0
        )));
    }
    let b0_prime = -1.0 - v0 * e_vvv / e_vv;

    Ok(BirchMurnaghan {
        e0: e(x0),
        v0,
        b0,
        b0_prime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic(params: &BirchMurnaghan, volumes: &[f64]) -> Vec<EnergyPoint> {
        volumes
            .iter()
            .map(|&v| EnergyPoint::new(format!("v{}", v), v, params.energy(v)))
            .collect()
    }

    #[test]
    fn test_exact_recovery() {
        let truth = BirchMurnaghan {
            e0: -14.9,
            v0: 66.4,
            b0: 76.0 / EV_PER_A3_TO_GPA,
            b0_prime: 4.5,
        };
        let volumes: Vec<f64> = (0..9).map(|i| 60.0 + 1.5 * i as f64).collect();
        let fit = fit_birch_murnaghan(&synthetic(&truth, &volumes)).unwrap();

        assert!((fit.params.v0 - truth.v0).abs() < 1e-6);
        assert!((fit.params.e0 - truth.e0).abs() < 1e-8);
        assert!((fit.params.b0_gpa() - 76.0).abs() < 1e-4);
        assert!((fit.params.b0_prime - 4.5).abs() < 1e-4);
        assert!(fit.rms < 1e-9);
    }

    #[test]
    fn test_pressure_zero_at_v0() {
        let p = BirchMurnaghan {
            e0: 0.0,
            v0: 20.0,
            b0: 1.0,
            b0_prime: 4.0,
        };
        assert!(pressure(20.0, &p).abs() < 1e-12);
        assert!(pressure(19.0, &p) > 0.0);
        assert!(pressure(21.0, &p) < 0.0);

        // P = −dE/dV
        let h = 1e-5;
        let numeric = -(birch_murnaghan_energy(19.0 + h, &p) - birch_murnaghan_energy(19.0 - h, &p)) / (2.0 * h);
        assert!((numeric - pressure(19.0, &p)).abs() < 1e-6);
    }

    #[test]
    fn test_too_few_volumes() {
        let points = vec![
            EnergyPoint::new("a", 10.0, -1.0),
            EnergyPoint::new("b", 11.0, -1.2),
            EnergyPoint::new("c", 11.0, -1.2),
            EnergyPoint::new("d", 12.0, -1.1),
        ];
        assert!(matches!(fit_birch_murnaghan(&points), Err(MdlabError::FitError(_))));
    }

    #[test]
    fn test_monotonic_data_has_no_minimum() {
        let points: Vec<EnergyPoint> = (0..6)
            .map(|i| EnergyPoint::new("m", 10.0 + i as f64, -(i as f64)))
            .collect();
        assert!(fit_birch_murnaghan(&points).is_err());
    }
}
