//! # 能量-体积数据模型
//!
//! 状态方程拟合的输入点，可由 OUTCAR、LAMMPS log 或 CSV 构造。
//!
//! ## 依赖关系
//! - 被 `parsers/outcar.rs`, `analysis/eos.rs` 使用

use serde::{Deserialize, Serialize};

/// 单个 E-V 数据点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyPoint {
    /// 数据来源标签（目录名、文件名等）
    pub label: String,

    /// 体积 (Å³)
    pub volume: f64,

    /// 能量 (eV)
    pub energy: f64,

    /// 压力 (kBar)
    pub pressure: Option<f64>,

    /// 原子数
    pub num_atoms: Option<usize>,
}

impl EnergyPoint {
    pub fn new(label: impl Into<String>, volume: f64, energy: f64) -> Self {
        EnergyPoint {
            label: label.into(),
            volume,
            energy,
            pressure: None,
            num_atoms: None,
        }
    }

    /// 每原子体积
    pub fn volume_per_atom(&self) -> Option<f64> {
        match self.num_atoms {
            Some(n) if n > 0 => Some(self.volume / n as f64),
            _ => None,
        }
    }

    /// 每原子能量
    pub fn energy_per_atom(&self) -> Option<f64> {
        match self.num_atoms {
            Some(n) if n > 0 => Some(self.energy / n as f64),
            _ => None,
        }
    }
}
