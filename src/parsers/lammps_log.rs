//! # LAMMPS log 解析器
//!
//! 提取 thermo 输出块与 `run` 命令。
//!
//! ## 格式说明
//! ```text
//! run 10000
//! ...
//!    Step          Temp          PotEng         Volume
//!          0   300           -3360.0         66430.0
//!        100   295.3         -3358.1         66502.2
//! Loop time of 12.3 on 4 procs for 10000 steps with 4000 atoms
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/analyze/eos.rs`, `commands/info.rs` 使用
//! - 使用 `models/energetics.rs`

use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;

use std::fs;
use std::path::Path;

/// 一个 thermo 输出块
#[derive(Debug, Clone, Default)]
pub struct ThermoBlock {
    /// 列名（如 Step, Temp, PotEng）
    pub columns: Vec<String>,
    /// 数据行
    pub rows: Vec<Vec<f64>>,
}

impl ThermoBlock {
    /// 按列名取整列
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    /// 某列的平均值
    pub fn mean(&self, name: &str) -> Option<f64> {
        let col = self.column(name)?;
        if col.is_empty() {
            return None;
        }
        Some(col.iter().sum::<f64>() / col.len() as f64)
    }
}

/// 解析后的 log
#[derive(Debug, Clone, Default)]
pub struct LammpsLog {
    /// `run N` 命令的步数
    pub runs: Vec<u64>,
    /// thermo 块
    pub blocks: Vec<ThermoBlock>,
}

impl LammpsLog {
    /// 最后一个包含某列的块
    pub fn last_block_with(&self, name: &str) -> Option<&ThermoBlock> {
        self.blocks
            .iter()
            .rev()
            .find(|b| b.columns.iter().any(|c| c == name))
    }

    /// 每个 thermo 块给出一个 E-V 点（对块内取平均）
    pub fn energy_points(&self, energy_column: &str, label: &str) -> Result<Vec<EnergyPoint>> {
        let points: Vec<EnergyPoint> = self
            .blocks
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                let v = b.mean("Volume")?;
                let e = b.mean(energy_column)?;
                let mut p = EnergyPoint::new(format!("{}#{}", label, i + 1), v, e);
                p.pressure = b.mean("Press");
                p.num_atoms = b.mean("Atoms").map(|n| n.round() as usize);
                Some(p)
            })
            .collect();

        if points.is_empty() {
            return Err(MdlabError::parse(
                "lammps-log",
                label,
                format!("No thermo block with 'Volume' and '{}' columns", energy_column),
            ));
        }
        Ok(points)
    }
}

/// 解析 log 文件
pub fn parse_log_file(path: &Path) -> Result<LammpsLog> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(parse_log_content(&content))
}

/// 从字符串内容解析 log
pub fn parse_log_content(content: &str) -> LammpsLog {
    let mut log = LammpsLog::default();
    let mut current: Option<ThermoBlock> = None;

    for line in content.lines() {
        let trimmed = line.trim();

        if current.is_some() {
            if trimmed.starts_with("Loop time") {
                if let Some(done) = current.take() {
                    log.blocks.push(done);
                }
                continue;
            }
            if let Some(block) = current.as_mut() {
                let values: Vec<f64> = trimmed
                    .split_whitespace()
                    .map_while(|s| s.parse::<f64>().ok())
                    .collect();
                // 中途的 WARNING 等非数值行忽略
                if values.len() == block.columns.len() {
                    block.rows.push(values);
                }
            }
            continue;
        }

        if trimmed.starts_with('#') {
            continue;
        }

        if trimmed.starts_with("run ") {
            if let Some(n) = trimmed.split_whitespace().nth(1).and_then(|s| s.parse().ok()) {
                log.runs.push(n);
            }
            continue;
        }

        if trimmed.starts_with("Step ") || trimmed == "Step" {
            current = Some(ThermoBlock {
                columns: trimmed.split_whitespace().map(|s| s.to_string()).collect(),
                rows: Vec::new(),
            });
        }
    }

    // 未正常结束（被中断）的块也保留
    if let Some(block) = current.take() {
        if !block.rows.is_empty() {
            log.blocks.push(block);
        }
    }

    log
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"LAMMPS (2 Aug 2023)
# comment run 5
units metal
run 200
Per MPI rank memory allocation (min/avg/max) = 3.1 | 3.1 | 3.1 Mbytes
   Step          Temp          PotEng         Volume         Press
         0   300           -3360.0         66000.0        100.0
       100   295           -3358.0         66100.0        50.0
       200   305           -3356.0         66200.0        0.0
Loop time of 1.0 on 1 procs for 200 steps with 4000 atoms

run 100
   Step          Temp          PotEng         Volume         Press
       200   305           -3300.0         67000.0        -10.0
WARNING: something happened
       300   300           -3302.0         67000.0        -30.0
Loop time of 0.5 on 1 procs for 100 steps with 4000 atoms
"#;

    #[test]
    fn test_parse_blocks_and_runs() {
        let log = parse_log_content(SAMPLE);
        assert_eq!(log.runs, vec![200, 100]);
        assert_eq!(log.blocks.len(), 2);
        assert_eq!(log.blocks[0].rows.len(), 3);
        assert_eq!(log.blocks[1].rows.len(), 2);
        assert_eq!(
            log.blocks[0].column("PotEng").unwrap(),
            vec![-3360.0, -3358.0, -3356.0]
        );
    }

    #[test]
    fn test_energy_points() {
        let log = parse_log_content(SAMPLE);
        let points = log.energy_points("PotEng", "log").unwrap();
        assert_eq!(points.len(), 2);
        assert!((points[0].volume - 66100.0).abs() < 1e-9);
        assert!((points[1].energy + 3301.0).abs() < 1e-9);
        assert!((points[1].pressure.unwrap() + 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_column() {
        let log = parse_log_content(SAMPLE);
        assert!(log.energy_points("TotEng", "log").is_err());
        assert!(log.last_block_with("Temp").is_some());
    }
}
