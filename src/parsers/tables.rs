//! # 表格数据读取
//!
//! 已经算好的 g(r) 表与 E-V 数据点的 CSV 输入。
//!
//! ## 格式说明
//! ```text
//! r,total,Al-Al,Al-Sm,Sm-Sm       (RDF：第一列 r，其余每列一条 g(r))
//! volume,energy[,label]           (E-V：表头大小写不敏感)
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/lammps_rdf.rs`, `commands/analyze/sq.rs`, `commands/analyze/eos.rs` 使用
//! - 使用 `csv` 库读取

use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;

use std::path::Path;

/// 一组按列存放的 g(r) 曲线
#[derive(Debug, Clone, PartialEq)]
pub struct RdfTable {
    /// r 网格 (Å)，等间距
    pub r: Vec<f64>,
    /// 列名（"total" 或 "A-B"）
    pub columns: Vec<String>,
    /// `values[c][k]` 为第 c 列在 r[k] 处的 g 值
    pub values: Vec<Vec<f64>>,
}

impl RdfTable {
    pub fn new(r: Vec<f64>, columns: Vec<String>, values: Vec<Vec<f64>>) -> Result<Self> {
        if r.len() < 2 {
            return Err(MdlabError::InvalidArgument(
                "RDF table needs at least two r points".to_string(),
            ));
        }
        if columns.len() != values.len() || values.iter().any(|v| v.len() != r.len()) {
            return Err(MdlabError::InvalidArgument(
                "RDF table columns do not match the r grid".to_string(),
            ));
        }
        Ok(RdfTable { r, columns, values })
    }

    /// 按列名取曲线
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(&self.values[idx])
    }

    /// 总 g(r)（列名 total / g / g_total）
    pub fn total(&self) -> Option<&[f64]> {
        ["total", "g", "g_total"]
            .iter()
            .find_map(|name| self.column(name))
    }

    /// 所有形如 "A-B" 的偏分布列：(A, B, g)
    pub fn partials(&self) -> Vec<(String, String, &[f64])> {
        self.columns
            .iter()
            .zip(&self.values)
            .filter_map(|(name, g)| {
                let (a, b) = name.split_once('-')?;
                Some((a.to_string(), b.to_string(), g.as_slice()))
            })
            .collect()
    }

    /// r 步长
    pub fn dr(&self) -> f64 {
        self.r[1] - self.r[0]
    }
}

/// 读取 CSV 格式的 g(r) 表
pub fn read_rdf_csv(path: &Path) -> Result<RdfTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(MdlabError::CsvError)?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(MdlabError::CsvError)?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if headers.len() < 2 {
        return Err(MdlabError::parse(
            "csv",
            &path.display().to_string(),
            "Expected an r column followed by at least one g(r) column",
        ));
    }

    let mut r = Vec::new();
    let mut values = vec![Vec::new(); headers.len() - 1];
    for record in rdr.records() {
        let record = record.map_err(MdlabError::CsvError)?;
        let row = parse_row(&record, &path.display().to_string())?;
        if row.len() != headers.len() {
            return Err(MdlabError::parse(
                "csv",
                &path.display().to_string(),
                format!("Row has {} fields, header has {}", row.len(), headers.len()),
            ));
        }
        r.push(row[0]);
        for (col, v) in values.iter_mut().zip(&row[1..]) {
            col.push(*v);
        }
    }

    // `analyze rdf` 的输出：g_ 前缀去掉，cn_ 列丢弃
    let (columns, values): (Vec<String>, Vec<Vec<f64>>) = headers[1..]
        .iter()
        .zip(values)
        .filter(|(h, _)| !h.starts_with("cn_"))
        .map(|(h, v)| (h.strip_prefix("g_").unwrap_or(h).to_string(), v))
        .unzip();

    RdfTable::new(r, columns, values)
}

/// 读取 CSV 格式的 E-V 数据
pub fn read_energy_csv(path: &Path) -> Result<Vec<EnergyPoint>> {
    let name = path.display().to_string();
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .comment(Some(b'#'))
        .from_path(path)
        .map_err(MdlabError::CsvError)?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(MdlabError::CsvError)?
        .iter()
        .map(|h| h.to_lowercase())
        .collect();
    // 允许 "energy_ev"、"volume (A^3)" 之类带单位的列名
    let find = |key: &str| {
        headers.iter().position(|h| {
            h == key || h.strip_prefix(key).is_some_and(|rest| rest.starts_with(['_', ' ', '(']))
        })
    };
    let v_idx = find("volume")
        .ok_or_else(|| MdlabError::parse("csv", &name, "Missing 'volume' column"))?;
    let e_idx = find("energy")
        .ok_or_else(|| MdlabError::parse("csv", &name, "Missing 'energy' column"))?;
    let label_idx = find("label");

    let mut points = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record.map_err(MdlabError::CsvError)?;
        let field = |idx: usize| -> Result<f64> {
            record
                .get(idx)
                .and_then(|s| s.parse::<f64>().ok())
                .ok_or_else(|| MdlabError::parse("csv", &name, format!("Bad number on row {}", i + 1)))
        };
        let label = label_idx
            .and_then(|idx| record.get(idx))
            .map(|s| s.to_string())
            .unwrap_or_else(|| format!("row{}", i + 1));
        points.push(EnergyPoint::new(label, field(v_idx)?, field(e_idx)?));
    }

    Ok(points)
}

fn parse_row(record: &csv::StringRecord, name: &str) -> Result<Vec<f64>> {
    record
        .iter()
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| MdlabError::parse("csv", name, format!("Bad number '{}'", s)))
        })
        .collect()
}
