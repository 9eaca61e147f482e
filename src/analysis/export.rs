//! # 分析结果导出
//!
//! 所有分析结果统一导出为 CSV（首行为列名）。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/` 调用
//! - 使用 `analysis/` 各结果结构
//! - 使用 `csv` 库写入 CSV 文件

use crate::analysis::bond_angle::BondAngleResult;
use crate::analysis::eos::EosFit;
use crate::analysis::honeycutt_andersen::HaSummary;
use crate::analysis::rdf::RdfResult;
use crate::analysis::structure_factor::SqResult;
use crate::analysis::voronoi::{VoronoiCell, VoronoiSummary};
use crate::analysis::warren_cowley::WarrenCowleyResult;
use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;

use std::fs::File;
use std::path::Path;

fn open(path: &Path) -> Result<csv::Writer<File>> {
    csv::Writer::from_path(path).map_err(MdlabError::CsvError)
}

fn close(mut wtr: csv::Writer<File>, path: &Path) -> Result<()> {
    wtr.flush().map_err(|e| MdlabError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// r, g_total, 各分量 g_ab 与 CN_ab
pub fn rdf_to_csv(result: &RdfResult, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;

    let mut header = vec!["r".to_string(), "g_total".to_string()];
    for (a, b) in &result.pairs {
        header.push(format!("g_{}-{}", a, b));
    }
    for (a, b) in &result.pairs {
        header.push(format!("cn_{}-{}", a, b));
    }
    wtr.write_record(&header)?;

    for (k, r) in result.r.iter().enumerate() {
        let mut row = vec![format!("{:.5}", r), format!("{:.6}", result.total[k])];
        row.extend(result.partial.iter().map(|g| format!("{:.6}", g[k])));
        row.extend(result.coordination.iter().map(|c| format!("{:.6}", c[k])));
        wtr.write_record(&row)?;
    }

    close(wtr, path)
}

/// q, S_total (若有), 各分量 S_ab
pub fn sq_to_csv(result: &SqResult, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;

    let mut header = vec!["q".to_string()];
    if result.total.is_some() {
        header.push("s_total".to_string());
    }
    for (a, b) in &result.pairs {
        header.push(format!("s_{}-{}", a, b));
    }
    wtr.write_record(&header)?;

    for (k, q) in result.q.iter().enumerate() {
        let mut row = vec![format!("{:.5}", q)];
        if let Some(total) = &result.total {
            row.push(format!("{:.6}", total[k]));
        }
        row.extend(result.partial.iter().map(|s| format!("{:.6}", s[k])));
        wtr.write_record(&row)?;
    }

    close(wtr, path)
}

/// angle, p_total, 各中心元素分量
pub fn bond_angle_to_csv(result: &BondAngleResult, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;

    let mut header = vec!["angle".to_string(), "p_total".to_string()];
    header.extend(result.partial.iter().map(|(s, _)| format!("p_{}", s)));
    wtr.write_record(&header)?;

    for (k, angle) in result.angle.iter().enumerate() {
        let mut row = vec![format!("{:.3}", angle), format!("{:.6e}", result.total[k])];
        row.extend(result.partial.iter().map(|(_, p)| format!("{:.6e}", p[k])));
        wtr.write_record(&row)?;
    }

    close(wtr, path)
}

/// 数据点与拟合值
pub fn eos_to_csv(points: &[EnergyPoint], fit: &EosFit, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;
    wtr.write_record(["label", "volume", "energy", "energy_fit", "pressure_gpa"])?;

    let mut sorted: Vec<&EnergyPoint> = points.iter().collect();
    sorted.sort_by(|a, b| a.volume.total_cmp(&b.volume));

    for p in sorted {
        wtr.write_record(&[
            p.label.clone(),
            format!("{:.6}", p.volume),
            format!("{:.8}", p.energy),
            format!("{:.8}", fit.params.energy(p.volume)),
            format!(
                "{:.4}",
                fit.params.pressure(p.volume) * crate::analysis::eos::EV_PER_A3_TO_GPA
            ),
        ])?;
    }

    close(wtr, path)
}

/// Voronoi 指数直方图
pub fn voronoi_histogram_to_csv(summary: &VoronoiSummary, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;
    wtr.write_record(["index", "n3", "n4", "n5", "n6", "n7+", "count", "fraction"])?;

    for (index, count) in &summary.histogram {
        let mut row = vec![index.to_string()];
        row.extend(index.0.iter().map(|n| n.to_string()));
        row.push(count.to_string());
        row.push(format!("{:.6}", *count as f64 / summary.cells.max(1) as f64));
        wtr.write_record(&row)?;
    }

    close(wtr, path)
}

/// 每个原子的 Voronoi 胞
pub fn voronoi_cells_to_csv(cells: &[VoronoiCell], path: &Path) -> Result<()> {
    let mut wtr = open(path)?;
    wtr.write_record([
        "atom",
        "element",
        "volume",
        "area",
        "index",
        "faces",
        "incomplete",
        "neighbors",
    ])?;

    for cell in cells {
        let neighbors = cell
            .neighbors
            .iter()
            .map(|n| (n + 1).to_string())
            .collect::<Vec<_>>()
            .join(" ");
        wtr.write_record(&[
            (cell.atom + 1).to_string(),
            cell.element.clone(),
            format!("{:.6}", cell.volume),
            format!("{:.6}", cell.area),
            cell.index.to_string(),
            cell.index.faces().to_string(),
            cell.incomplete.to_string(),
            neighbors,
        ])?;
    }

    close(wtr, path)
}

/// HA 指数计数
pub fn ha_to_csv(summary: &HaSummary, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;
    wtr.write_record(["signature", "count", "fraction"])?;

    for (signature, count) in &summary.signatures {
        wtr.write_record(&[
            signature.to_string(),
            count.to_string(),
            format!("{:.6}", *count as f64 / summary.pairs.max(1) as f64),
        ])?;
    }

    close(wtr, path)
}

/// α_ab 矩阵，行为中心元素
pub fn warren_cowley_to_csv(result: &WarrenCowleyResult, path: &Path) -> Result<()> {
    let mut wtr = open(path)?;

    let mut header = vec!["center".to_string()];
    header.extend(result.species.iter().cloned());
    wtr.write_record(&header)?;

    for (s, row) in result.species.iter().zip(&result.alpha) {
        let mut record = vec![s.clone()];
        record.extend(row.iter().map(|a| format!("{:.6}", a)));
        wtr.write_record(&record)?;
    }

    close(wtr, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::eos::{fit_birch_murnaghan, BirchMurnaghan};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mdlab_export_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_warren_cowley_matrix() {
        let result = WarrenCowleyResult {
            species: vec!["Ni".into(), "Al".into()],
            composition: vec![0.5, 0.5],
            alpha: vec![vec![1.0, -1.0], vec![-1.0, 1.0]],
            coordination: vec![8.0, 8.0],
            frames: 1,
        };
        let path = temp_path("wc.csv");
        warren_cowley_to_csv(&result, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "center,Ni,Al");
        assert_eq!(lines[1], "Ni,1.000000,-1.000000");
    }

    #[test]
    fn test_eos_rows_sorted_by_volume() {
        let truth = BirchMurnaghan {
            e0: -3.0,
            v0: 16.0,
            b0: 0.5,
            b0_prime: 4.0,
        };
        let points: Vec<EnergyPoint> = [18.0, 14.0, 16.0, 15.0, 17.0]
            .iter()
            .map(|&v| EnergyPoint::new(format!("{}", v), v, truth.energy(v)))
            .collect();
        let fit = fit_birch_murnaghan(&points).unwrap();

        let path = temp_path("eos.csv");
        eos_to_csv(&points, &fit, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();

        let volumes: Vec<&str> = text
            .lines()
            .skip(1)
            .map(|l| l.split(',').nth(1).unwrap())
            .collect();
        assert_eq!(volumes, ["14.000000", "15.000000", "16.000000", "17.000000", "18.000000"]);
    }
}
