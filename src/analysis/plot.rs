//! # 分析结果绘图
//!
//! 使用 `plotters` 生成 g(r)、S(q)、键角分布、E-V 曲线与 Voronoi 指数直方图。
//! 根据 `use_svg` 输出 SVG 或 PNG。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/` 调用
//! - 使用 `analysis/` 各结果结构
//! - 使用 `plotters` 渲染图表

use crate::analysis::bond_angle::BondAngleResult;
use crate::analysis::eos::EosFit;
use crate::analysis::rdf::RdfResult;
use crate::analysis::structure_factor::SqResult;
use crate::analysis::voronoi::VoronoiSummary;
use crate::error::{MdlabError, Result};
use crate::models::EnergyPoint;

use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// 图片尺寸与格式
#[derive(Debug, Clone, Copy)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub use_svg: bool,
}

impl Default for PlotStyle {
    fn default() -> Self {
        PlotStyle {
            width: 1200,
            height: 800,
            use_svg: false,
        }
    }
}

/// 一条曲线
struct Series {
    label: String,
    points: Vec<(f64, f64)>,
    color: RGBColor,
}

const PALETTE: [RGBColor; 6] = [
    RGBColor(0, 102, 204),
    RGBColor(204, 51, 51),
    RGBColor(51, 153, 51),
    RGBColor(230, 140, 0),
    RGBColor(128, 51, 179),
    RGBColor(0, 153, 153),
];

fn plot_err<E: std::fmt::Debug>(e: E) -> MdlabError {
    MdlabError::Other(format!("{:?}", e))
}

fn value_range(series: &[Series], floor: Option<f64>) -> (f64, f64, f64, f64) {
    let xs = series.iter().flat_map(|s| s.points.iter().map(|p| p.0));
    let ys = series.iter().flat_map(|s| s.points.iter().map(|p| p.1));
    let x_min = xs.clone().fold(f64::INFINITY, f64::min);
    let x_max = xs.fold(f64::NEG_INFINITY, f64::max);
    let mut y_min = ys.clone().fold(f64::INFINITY, f64::min);
    let mut y_max = ys.fold(f64::NEG_INFINITY, f64::max);
    if let Some(f) = floor {
        y_min = y_min.min(f);
    }
    if !x_min.is_finite() || !y_min.is_finite() {
        return (0.0, 1.0, 0.0, 1.0);
    }
    let pad = 0.05 * (y_max - y_min).max(1e-12);
    y_max += pad;
    if floor.is_none() {
        y_min -= pad;
    }
    (x_min, x_max.max(x_min + 1e-12), y_min, y_max)
}

/// 绘制多条曲线的核心逻辑
fn draw_line_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &[Series],
    title: &str,
    x_desc: &str,
    y_desc: &str,
    floor: Option<f64>,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let (x_min, x_max, y_min, y_max) = value_range(series, floor);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    for s in series {
        let color = s.color;
        chart
            .draw_series(LineSeries::new(s.points.iter().copied(), color.stroke_width(2)))
            .map_err(plot_err)?
            .label(s.label.clone())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if series.len() > 1 {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .label_font(("sans-serif", 14))
            .draw()
            .map_err(plot_err)?;
    }

    Ok(())
}

fn line_plot(
    series: &[Series],
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    floor: Option<f64>,
    style: &PlotStyle,
) -> Result<()> {
    if style.use_svg {
        let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
        draw_line_chart(&root, series, title, x_desc, y_desc, floor)?;
        root.present().map_err(|e| MdlabError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
        draw_line_chart(&root, series, title, x_desc, y_desc, floor)?;
        root.present().map_err(|e| MdlabError::Other(e.to_string()))?;
    }
    Ok(())
}

fn zip_xy(x: &[f64], y: &[f64]) -> Vec<(f64, f64)> {
    x.iter().copied().zip(y.iter().copied()).collect()
}

/// g(r)：总 g(r) 与各分量
pub fn generate_rdf_plot(result: &RdfResult, path: &Path, title: &str, style: &PlotStyle) -> Result<()> {
    let mut series = vec![Series {
        label: "total".to_string(),
        points: zip_xy(&result.r, &result.total),
        color: PALETTE[0],
    }];
    if result.pairs.len() > 1 {
        for (k, ((a, b), g)) in result.pairs.iter().zip(&result.partial).enumerate() {
            series.push(Series {
                label: format!("{}-{}", a, b),
                points: zip_xy(&result.r, g),
                color: PALETTE[(k + 1) % PALETTE.len()],
            });
        }
    }
    line_plot(&series, path, title, "r (Å)", "g(r)", Some(0.0), style)
}

/// S(q)：总 S(q) 优先，否则画各分量
pub fn generate_sq_plot(result: &SqResult, path: &Path, title: &str, style: &PlotStyle) -> Result<()> {
    let mut series = Vec::new();
    if let Some(total) = &result.total {
        series.push(Series {
            label: "total".to_string(),
            points: zip_xy(&result.q, total),
            color: PALETTE[0],
        });
    }
    for (k, ((a, b), s)) in result.pairs.iter().zip(&result.partial).enumerate() {
        series.push(Series {
            label: format!("{}-{}", a, b),
            points: zip_xy(&result.q, s),
            color: PALETTE[(k + 1) % PALETTE.len()],
        });
    }
    line_plot(&series, path, title, "q (1/Å)", "S(q)", None, style)
}

/// 键角分布
pub fn generate_bond_angle_plot(
    result: &BondAngleResult,
    path: &Path,
    title: &str,
    style: &PlotStyle,
) -> Result<()> {
    let mut series = vec![Series {
        label: "total".to_string(),
        points: zip_xy(&result.angle, &result.total),
        color: PALETTE[0],
    }];
    if result.partial.len() > 1 {
        for (k, (s, p)) in result.partial.iter().enumerate() {
            series.push(Series {
                label: s.clone(),
                points: zip_xy(&result.angle, p),
                color: PALETTE[(k + 1) % PALETTE.len()],
            });
        }
    }
    line_plot(&series, path, title, "Angle (°)", "P(θ) (1/°)", Some(0.0), style)
}

/// E-V 数据点与 Birch-Murnaghan 曲线
pub fn generate_eos_plot(
    points: &[EnergyPoint],
    fit: &EosFit,
    path: &Path,
    title: &str,
    style: &PlotStyle,
) -> Result<()> {
    if style.use_svg {
        let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
        draw_eos_chart(&root, points, fit, title)?;
        root.present().map_err(|e| MdlabError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
        draw_eos_chart(&root, points, fit, title)?;
        root.present().map_err(|e| MdlabError::Other(e.to_string()))?;
    }
    Ok(())
}

fn draw_eos_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    points: &[EnergyPoint],
    fit: &EosFit,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let v_min = points.iter().map(|p| p.volume).fold(f64::INFINITY, f64::min);
    let v_max = points.iter().map(|p| p.volume).fold(f64::NEG_INFINITY, f64::max);
    let span = (v_max - v_min).max(1e-6);
    let (v_lo, v_hi) = (v_min - 0.05 * span, v_max + 0.05 * span);

    let curve: Vec<(f64, f64)> = (0..=200)
        .map(|k| {
            let v = v_lo + (v_hi - v_lo) * k as f64 / 200.0;
            (v, fit.params.energy(v))
        })
        .collect();
    let energies = points.iter().map(|p| p.energy).chain(curve.iter().map(|c| c.1));
    let e_min = energies.clone().fold(f64::INFINITY, f64::min);
    let e_max = energies.fold(f64::NEG_INFINITY, f64::max);
    let pad = 0.05 * (e_max - e_min).max(1e-9);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d(v_lo..v_hi, (e_min - pad)..(e_max + pad))
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("Volume (Å³)")
        .y_desc("Energy (eV)")
        .x_label_style(("sans-serif", 16))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(LineSeries::new(curve, PALETTE[0].stroke_width(2)))
        .map_err(plot_err)?;
    chart
        .draw_series(
            points
                .iter()
                .map(|p| Circle::new((p.volume, p.energy), 5, PALETTE[1].filled())),
        )
        .map_err(plot_err)?;

    let text = format!(
        "V0 = {:.3} Å³   B0 = {:.1} GPa   B0' = {:.2}",
        fit.params.v0,
        fit.params.b0_gpa(),
        fit.params.b0_prime
    );
    chart
        .draw_series(std::iter::once(Text::new(
            text,
            (v_lo + 0.05 * (v_hi - v_lo), e_max),
            ("sans-serif", 14).into_font().color(&BLACK),
        )))
        .map_err(plot_err)?;

    Ok(())
}

/// 出现次数最多的 Voronoi 指数
pub fn generate_voronoi_plot(
    summary: &VoronoiSummary,
    top: usize,
    path: &Path,
    title: &str,
    style: &PlotStyle,
) -> Result<()> {
    if style.use_svg {
        let root = SVGBackend::new(path, (style.width, style.height)).into_drawing_area();
        draw_voronoi_chart(&root, summary, top, title)?;
        root.present().map_err(|e| MdlabError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
        draw_voronoi_chart(&root, summary, top, title)?;
        root.present().map_err(|e| MdlabError::Other(e.to_string()))?;
    }
    Ok(())
}

fn draw_voronoi_chart<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    summary: &VoronoiSummary,
    top: usize,
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(plot_err)?;

    let bars: Vec<(String, f64)> = summary
        .histogram
        .iter()
        .take(top.max(1))
        .map(|(index, n)| (index.to_string(), 100.0 * *n as f64 / summary.cells.max(1) as f64))
        .collect();
    let y_max = bars.iter().map(|b| b.1).fold(0.0, f64::max).max(1.0) * 1.1;
    let n = bars.len().max(1);

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 28).into_font())
        .margin(30)
        .x_label_area_size(90)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n).into_segmented(), 0.0..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x: &SegmentValue<usize>| match x {
            SegmentValue::CenterOf(k) => bars.get(*k).map(|b| b.0.clone()).unwrap_or_default(),
            _ => String::new(),
        })
        .y_desc("Fraction (%)")
        .x_label_style(("sans-serif", 13))
        .y_label_style(("sans-serif", 16))
        .axis_desc_style(("sans-serif", 18))
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(
            Histogram::vertical(&chart)
                .style(PALETTE[0].mix(0.8).filled())
                .margin(6)
                .data(bars.iter().enumerate().map(|(k, b)| (k, b.1))),
        )
        .map_err(plot_err)?;

    Ok(())
}
