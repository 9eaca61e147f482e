//! # VASP OUTCAR 解析器
//!
//! 解析 VASP 计算输出文件 OUTCAR，提取能量、体积、压力等信息，
//! 作为状态方程拟合的数据点。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/eos.rs`, `commands/info.rs` 使用
//! - 使用 `models/energetics.rs`

use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// OUTCAR 提取结果
#[derive(Debug, Clone, Default)]
pub struct OutcarSummary {
    /// 计算是否正常结束
    pub is_finished: bool,
    /// energy(sigma->0) (eV)
    pub energy_sigma0: Option<f64>,
    /// free energy TOTEN (eV)
    pub free_energy: Option<f64>,
    /// 焓 (eV)
    pub enthalpy: Option<f64>,
    /// 体积 (Å³)
    pub volume: Option<f64>,
    /// 外压 (kBar)
    pub pressure: Option<f64>,
    /// 原子数
    pub num_atoms: Option<usize>,
    /// 离子步数
    pub ionic_steps: usize,
}

impl OutcarSummary {
    /// 转换为 E-V 数据点（优先 energy(sigma->0)）
    pub fn to_energy_point(&self, label: &str) -> Result<EnergyPoint> {
        let energy = self.energy_sigma0.or(self.free_energy).ok_or_else(|| {
            MdlabError::parse("outcar", label, "No total energy found")
        })?;
        let volume = self
            .volume
            .ok_or_else(|| MdlabError::parse("outcar", label, "No cell volume found"))?;

        let mut point = EnergyPoint::new(label, volume, energy);
        point.pressure = self.pressure;
        point.num_atoms = self.num_atoms;
        Ok(point)
    }
}

/// 解析 VASP OUTCAR 文件
pub fn parse_outcar(path: &Path) -> Result<OutcarSummary> {
    let file = File::open(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let reader = BufReader::new(file);
    let mut lines = Vec::new();
    for line in reader.lines() {
        match line {
            Ok(l) => lines.push(l),
            Err(_) => continue,
        }
    }

    Ok(parse_outcar_lines(lines.iter().map(|s| s.as_str())))
}

/// 逐行解析 OUTCAR 内容（所有量取最后一次出现的值）
pub fn parse_outcar_lines<'a>(lines: impl Iterator<Item = &'a str>) -> OutcarSummary {
    let mut summary = OutcarSummary::default();

    for line in lines {
        // 检查是否完成
        if line.contains("General timing and accounting informations for this job") {
            summary.is_finished = true;
        }

        // "enthalpy is  TOTEN    =      -123.456789 eV"
        if line.contains("enthalpy is  TOTEN") {
            if let Some(val) = extract_number_after(line, "=") {
                summary.enthalpy = Some(val);
            }
        }

        // "free  energy   TOTEN  =      -123.456789 eV"
        if line.contains("free  energy   TOTEN") {
            if let Some(val) = extract_number_after(line, "=") {
                summary.free_energy = Some(val);
                summary.ionic_steps += 1;
            }
        }

        // "energy  without entropy=     -123.456789  energy(sigma->0) =     -123.456789"
        if line.contains("energy  without entropy") {
            if let Some(pos) = line.find("energy(sigma->0)") {
                if let Some(val) = extract_number_after(&line[pos..], "=") {
                    summary.energy_sigma0 = Some(val);
                }
            }
        }

        // "  volume of cell :      123.456789"
        if line.contains("volume of cell") {
            if let Some(val) = extract_last_number(line) {
                summary.volume = Some(val);
            }
        }

        // "  external pressure =       -1.23 kB  Pullay stress =        0.00 kB"
        if line.contains("external pressure =") {
            if let Some(val) = extract_number_after(line, "external pressure =") {
                summary.pressure = Some(val);
            }
        }

        // "   NIONS =       8"
        if line.contains("NIONS =") {
            if let Some(val) = extract_last_number(line) {
                summary.num_atoms = Some(val as usize);
            }
        }
    }

    summary
}

/// 从字符串中提取指定标记之后的数字
fn extract_number_after(s: &str, marker: &str) -> Option<f64> {
    let pos = s.find(marker)?;
    let after = &s[pos + marker.len()..];
    after.split_whitespace().next()?.parse().ok()
}

/// 提取字符串中最后一个数字
fn extract_last_number(s: &str) -> Option<f64> {
    s.split_whitespace()
        .filter_map(|w| w.parse::<f64>().ok())
        .last()
}
