//! # LAMMPS RDF 文件解析器
//!
//! 解析 `compute rdf` + `fix ave/time ... mode vector` 输出的 g(r) 文件，
//! 对所有时间块取平均。
//!
//! ## 格式说明
//! ```text
//! # Time-averaged data for fix rdf
//! # TimeStep Number-of-rows
//! # Row c_rdf[1] c_rdf[2] c_rdf[3] ...
//! 1000 100
//! 1 0.05 0.0 0.0 0.0 0.0
//! ...
//! ```
//! 每行：行号、r、然后每个原子对一组 (g, coord)。
//!
//! ## 依赖关系
//! - 被 `parsers/tables.rs`（RdfTable）与 `commands/analyze/sq.rs` 使用

use crate::error::{MdlabError, Result};
use crate::parsers::tables::RdfTable;

use std::fs;
use std::path::Path;

/// 解析 LAMMPS RDF 文件
pub fn parse_lammps_rdf_file(path: &Path, pair_labels: &[String]) -> Result<RdfTable> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_lammps_rdf_content(&content, &path.display().to_string(), pair_labels)
}

/// 从字符串内容解析；`pair_labels` 为空时自动命名为 pair1, pair2...
pub fn parse_lammps_rdf_content(
    content: &str,
    name: &str,
    pair_labels: &[String],
) -> Result<RdfTable> {
    let data: Vec<Vec<f64>> = content
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(|l| {
            l.split_whitespace()
                .map(|s| {
                    s.parse::<f64>()
                        .map_err(|_| MdlabError::parse("lammps-rdf", name, format!("Bad value '{}'", s)))
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<_>>()?;

    let mut idx = 0;
    let mut r: Vec<f64> = Vec::new();
    let mut sums: Vec<Vec<f64>> = Vec::new();
    let mut n_blocks = 0usize;

    while idx < data.len() {
        let header = &data[idx];
        if header.len() != 2 {
            return Err(MdlabError::parse(
                "lammps-rdf",
                name,
                format!("Expected 'timestep nrows' block header, found {} values", header.len()),
            ));
        }
        let nrows = header[1] as usize;
        if nrows == 0 || idx + 1 + nrows > data.len() {
            return Err(MdlabError::parse("lammps-rdf", name, "Truncated block"));
        }

        let rows = &data[idx + 1..idx + 1 + nrows];
        let width = rows[0].len();
        if width < 4 || (width - 2) % 2 != 0 {
            return Err(MdlabError::parse(
                "lammps-rdf",
                name,
                format!("Unexpected row width {}", width),
            ));
        }
        let n_pairs = (width - 2) / 2;

        if n_blocks == 0 {
            r = rows.iter().map(|row| row[1]).collect();
            sums = vec![vec![0.0; nrows]; n_pairs];
        } else if r.len() != nrows || sums.len() != n_pairs {
            return Err(MdlabError::parse(
                "lammps-rdf",
                name,
                "Blocks have different shapes",
            ));
        }

        for (k, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(MdlabError::parse("lammps-rdf", name, "Ragged row"));
            }
            for (p, sum) in sums.iter_mut().enumerate() {
                sum[k] += row[2 + 2 * p];
            }
        }

        n_blocks += 1;
        idx += 1 + nrows;
    }

    if n_blocks == 0 {
        return Err(MdlabError::parse("lammps-rdf", name, "No data blocks found"));
    }

    let columns: Vec<String> = (0..sums.len())
        .map(|p| {
            pair_labels
                .get(p)
                .cloned()
                .unwrap_or_else(|| format!("pair{}", p + 1))
        })
        .collect();
    let values: Vec<Vec<f64>> = sums
        .into_iter()
        .map(|s| s.into_iter().map(|v| v / n_blocks as f64).collect())
        .collect();

    log::debug!("LAMMPS RDF '{}': averaged {} block(s)", name, n_blocks);

    RdfTable::new(r, columns, values)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"# Time-averaged data for fix rdf
# TimeStep Number-of-rows
# Row c_rdf[1] c_rdf[2] c_rdf[3] c_rdf[4]
1000 3
1 0.5 0.0 0.0 0.0 0.0
2 1.5 2.0 1.0 1.0 0.5
3 2.5 1.0 3.0 1.0 1.5
2000 3
1 0.5 0.0 0.0 0.0 0.0
2 1.5 4.0 1.0 3.0 0.5
3 2.5 1.0 3.0 1.0 1.5
"#;

    #[test]
    fn test_average_blocks() {
        let labels = vec!["Al-Al".to_string(), "Al-Sm".to_string()];
        let table = parse_lammps_rdf_content(SAMPLE, "rdf", &labels).unwrap();
        assert_eq!(table.r, vec![0.5, 1.5, 2.5]);
        assert_eq!(table.columns, labels);
        assert!((table.values[0][1] - 3.0).abs() < 1e-12);
        assert!((table.values[1][1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_default_labels() {
        let table = parse_lammps_rdf_content(SAMPLE, "rdf", &[]).unwrap();
        assert_eq!(table.columns, vec!["pair1".to_string(), "pair2".to_string()]);
    }

    #[test]
    fn test_truncated_block() {
        let content = "1000 3\n1 0.5 0 0\n2 1.5 1 1\n";
        assert!(parse_lammps_rdf_content(content, "rdf", &[]).is_err());

        // 第二个块少一行
        let second = "1000 2\n1 0.5 0 0\n2 1.5 1 1\n2000 2\n1 0.5 0 0\n";
        assert!(parse_lammps_rdf_content(second, "rdf", &[]).is_err());

        let empty = "1000 0\n";
        assert!(parse_lammps_rdf_content(empty, "rdf", &[]).is_err());
    }
}
