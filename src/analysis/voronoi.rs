//! # Voronoi 多面体分析
//!
//! 每个原子的 Voronoi 胞由一个初始立方体被所有近邻的中垂面依次切割得到。
//! 多面体以面多边形列表表示：每个面用 Sutherland-Hodgman 方法裁剪，
//! 切口处的交点按角度排序组成新的面。
//!
//! ## 输出
//! - 体积、表面积、面数
//! - Voronoi 指数 ⟨n3, n4, n5, n6⟩（n 条边的面数；7 条边以上计入 n7+）
//! - 面对应的近邻原子
//!
//! 若有顶点到中心的距离超过截断半径的一半，说明截断外的原子可能还会切割该胞，
//! 此时标记为 `incomplete`。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/voronoi.rs` 使用
//! - 使用 `neighbors.rs`, `pipeline.rs`
//! - 使用 `rayon` 并行计算每个原子的胞

use crate::error::{MdlabError, Result};
use crate::models::{cross, dot, norm, Frame};
use crate::neighbors::{Neighbor, NeighborList};
use crate::pipeline::FrameAnalysis;

use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;

/// Voronoi 参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoronoiParams {
    /// 近邻搜索半径 (Å)；None 时取平均原子间距的 2 倍
    pub cutoff: Option<f64>,
    /// 相对面积阈值：面积小于 阈值 × 总表面积 的面不计入指数
    pub face_area_threshold: f64,
    /// 短于该长度 (Å) 的棱合并
    pub edge_threshold: f64,
}

impl Default for VoronoiParams {
    fn default() -> Self {
        VoronoiParams {
            cutoff: None,
            face_area_threshold: 0.0,
            edge_threshold: 0.0,
        }
    }
}

/// Voronoi 指数 ⟨n3, n4, n5, n6, n7+⟩
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VoronoiIndex(pub [usize; 5]);

impl VoronoiIndex {
    /// 面数
    pub fn faces(&self) -> usize {
        self.0.iter().sum()
    }
}

impl std::fmt::Display for VoronoiIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [n3, n4, n5, n6, n7] = self.0;
        if n7 > 0 {
            write!(f, "<{},{},{},{},{}>", n3, n4, n5, n6, n7)
        } else {
            write!(f, "<{},{},{},{}>", n3, n4, n5, n6)
        }
    }
}

/// 单个原子的 Voronoi 胞
#[derive(Debug, Clone, Serialize)]
pub struct VoronoiCell {
    pub atom: usize,
    pub element: String,
    /// 体积 (Å³)
    pub volume: f64,
    /// 表面积 (Å²)
    pub area: f64,
    pub index: VoronoiIndex,
    /// 计入指数的面对应的近邻（与面一一对应）
    pub neighbors: Vec<usize>,
    pub incomplete: bool,
}

/// 平均原子间距的 2 倍
pub fn default_cutoff(frame: &Frame) -> f64 {
    2.0 * frame.volume_per_atom().unwrap_or(1.0).cbrt()
}

// ─────────────────────────────────────────────────────────────
// 多面体裁剪
// ─────────────────────────────────────────────────────────────

type Vec3 = [f64; 3];

#[derive(Debug, Clone)]
struct Face {
    verts: Vec<Vec3>,
    neighbor: Option<usize>,
}

fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

fn lerp(a: &Vec3, b: &Vec3, t: f64) -> Vec3 {
    [
        a[0] + t * (b[0] - a[0]),
        a[1] + t * (b[1] - a[1]),
        a[2] + t * (b[2] - a[2]),
    ]
}

fn push_unique(points: &mut Vec<Vec3>, p: Vec3, tol2: f64) {
    if !points.iter().any(|q| {
        let d = sub(q, &p);
        dot(&d, &d) < tol2
    }) {
        points.push(p);
    }
}

/// 以 half 为半边长、中心在原点的立方体
fn initial_cube(half: f64) -> Vec<Face> {
    let h = half;
    let quad = |a: Vec3, b: Vec3, c: Vec3, d: Vec3| Face {
        verts: vec![a, b, c, d],
        neighbor: None,
    };
    vec![
        quad([h, -h, -h], [h, h, -h], [h, h, h], [h, -h, h]),
        quad([-h, -h, -h], [-h, -h, h], [-h, h, h], [-h, h, -h]),
        quad([-h, h, -h], [-h, h, h], [h, h, h], [h, h, -h]),
        quad([-h, -h, -h], [h, -h, -h], [h, -h, h], [-h, -h, h]),
        quad([-h, -h, h], [h, -h, h], [h, h, h], [-h, h, h]),
        quad([-h, -h, -h], [-h, h, -h], [h, h, -h], [h, -h, -h]),
    ]
}

/// 保留 p·n ≤ offset 的部分
fn clip(faces: &mut Vec<Face>, normal: &Vec3, offset: f64, neighbor: usize, eps: f64, tol2: f64) {
    let signed = |p: &Vec3| dot(p, normal) - offset;

    // 平面不与多面体相交（至多相切）
    if faces.iter().all(|f| f.verts.iter().all(|p| signed(p) <= eps)) {
        return;
    }

    let mut cap: Vec<Vec3> = Vec::new();
    let mut kept = Vec::with_capacity(faces.len() + 1);

    for face in faces.drain(..) {
        let d: Vec<f64> = face.verts.iter().map(|p| signed(p)).collect();

        for (p, &dp) in face.verts.iter().zip(&d) {
            if dp.abs() <= eps {
                push_unique(&mut cap, *p, tol2);
            }
        }
        if d.iter().all(|&x| x <= eps) {
            kept.push(face);
            continue;
        }
        if d.iter().all(|&x| x >= -eps) {
            continue;
        }

        let n = face.verts.len();
        let mut poly: Vec<Vec3> = Vec::with_capacity(n + 2);
        for k in 0..n {
            let (p, dp) = (&face.verts[k], d[k]);
            let (q, dq) = (&face.verts[(k + 1) % n], d[(k + 1) % n]);
            if dp <= eps {
                poly.push(*p);
            }
            if (dp < -eps && dq > eps) || (dp > eps && dq < -eps) {
                let x = lerp(p, q, dp / (dp - dq));
                poly.push(x);
                push_unique(&mut cap, x, tol2);
            }
        }
        dedupe_cyclic(&mut poly, tol2);
        if poly.len() >= 3 {
            kept.push(Face {
                verts: poly,
                neighbor: face.neighbor,
            });
        }
    }

    if cap.len() >= 3 {
        sort_around(&mut cap, normal);
        kept.push(Face {
            verts: cap,
            neighbor: Some(neighbor),
        });
    }

    *faces = kept;
}

fn dedupe_cyclic(poly: &mut Vec<Vec3>, tol2: f64) {
    poly.dedup_by(|a, b| {
        let d = sub(a, b);
        dot(&d, &d) < tol2
    });
    while poly.len() > 1 {
        let d = sub(&poly[0], &poly[poly.len() - 1]);
        if dot(&d, &d) < tol2 {
            poly.pop();
        } else {
            break;
        }
    }
}

/// 共面点按绕法向的角度排序
fn sort_around(points: &mut [Vec3], normal: &Vec3) {
    let n = points.len() as f64;
    let c = points.iter().fold([0.0; 3], |acc, p| {
        [acc[0] + p[0] / n, acc[1] + p[1] / n, acc[2] + p[2] / n]
    });
    let u = sub(&points[0], &c);
    let w = cross(normal, &u);
    points.sort_by(|a, b| {
        let da = sub(a, &c);
        let db = sub(b, &c);
        let ta = dot(&da, &w).atan2(dot(&da, &u));
        let tb = dot(&db, &w).atan2(dot(&db, &u));
        ta.total_cmp(&tb)
    });
}

/// 面的矢量面积 ½ Σ p_k × p_{k+1}
fn vector_area(verts: &[Vec3]) -> Vec3 {
    let n = verts.len();
    let mut a = [0.0; 3];
    for k in 0..n {
        let c = cross(&verts[k], &verts[(k + 1) % n]);
        a[0] += 0.5 * c[0];
        a[1] += 0.5 * c[1];
        a[2] += 0.5 * c[2];
    }
    a
}

/// 合并短棱与共线点后的边数
fn edge_count(verts: &[Vec3], min_edge: f64) -> usize {
    let mut pts: Vec<Vec3> = verts.to_vec();
    let min2 = min_edge * min_edge;
    dedupe_cyclic(&mut pts, min2);

    // 去掉共线的中间点
    let mut changed = true;
    while changed && pts.len() > 3 {
        changed = false;
        let n = pts.len();
        for k in 0..n {
            let prev = &pts[(k + n - 1) % n];
            let next = &pts[(k + 1) % n];
            let e1 = sub(&pts[k], prev);
            let e2 = sub(next, &pts[k]);
            if norm(&cross(&e1, &e2)) < 1e-8 * norm(&e1) * norm(&e2) {
                pts.remove(k);
                changed = true;
                break;
            }
        }
    }
    pts.len()
}

/// 计算单个原子的 Voronoi 胞
pub fn compute_cell(
    atom: usize,
    element: &str,
    neighbors: &[Neighbor],
    cutoff: f64,
    params: &VoronoiParams,
) -> VoronoiCell {
    let scale = cutoff;
    let eps = 1e-10 * scale * scale;
    let tol2 = (1e-8 * scale).powi(2);

    let mut faces = initial_cube(cutoff);
    for n in neighbors {
        let offset = 0.5 * dot(&n.vector, &n.vector);
        clip(&mut faces, &n.vector, offset, n.index, eps, tol2);
    }

    let mut volume = 0.0;
    let mut areas = Vec::with_capacity(faces.len());
    for face in &faces {
        let va = vector_area(&face.verts);
        volume += dot(&va, &face.verts[0]).abs() / 3.0;
        areas.push(norm(&va));
    }
    let area: f64 = areas.iter().sum();

    let half = 0.5 * cutoff;
    let incomplete = faces.iter().any(|f| f.neighbor.is_none())
        || faces
            .iter()
            .flat_map(|f| f.verts.iter())
            .any(|p| norm(p) > half);

    let min_edge = params.edge_threshold.max(1e-8 * scale);
    let mut index = [0usize; 5];
    let mut face_neighbors = Vec::new();
    for (face, &a) in faces.iter().zip(&areas) {
        if a <= params.face_area_threshold * area || a < 1e-12 * scale * scale {
            continue;
        }
        let edges = edge_count(&face.verts, min_edge);
        if edges < 3 {
            continue;
        }
        index[(edges - 3).min(4)] += 1;
        if let Some(j) = face.neighbor {
            face_neighbors.push(j);
        }
    }

    VoronoiCell {
        atom,
        element: element.to_string(),
        volume,
        area,
        index: VoronoiIndex(index),
        neighbors: face_neighbors,
        incomplete,
    }
}

/// 一帧的全部 Voronoi 胞
pub fn tessellate(frame: &Frame, neighbors: &NeighborList, params: &VoronoiParams) -> Vec<VoronoiCell> {
    let cutoff = neighbors.cutoff();
    (0..frame.len())
        .into_par_iter()
        .map(|i| {
            compute_cell(
                i,
                &frame.atoms[i].element,
                neighbors.neighbors(i),
                cutoff,
                params,
            )
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────
// 多帧统计
// ─────────────────────────────────────────────────────────────

/// 多帧统计结果
#[derive(Debug, Clone, Serialize)]
pub struct VoronoiSummary {
    /// 指数直方图，按出现次数降序
    pub histogram: Vec<(VoronoiIndex, usize)>,
    /// 每种元素的 (元素, 平均体积, 胞数)
    pub species_volumes: Vec<(String, f64, usize)>,
    pub cells: usize,
    pub incomplete: usize,
    pub frames: usize,
    /// 完整帧中 Σ 胞体积 与 盒子体积 的最大相对偏差
    pub max_volume_error: Option<f64>,
    /// 最后一帧的所有胞
    pub last_frame: Vec<VoronoiCell>,
}

/// 逐帧累积的 Voronoi 分析
#[derive(Debug, Clone)]
pub struct VoronoiAnalysis {
    params: VoronoiParams,
    cutoff: f64,
    histogram: HashMap<VoronoiIndex, usize>,
    species: Vec<String>,
    volume_sums: Vec<(f64, usize)>,
    cells: usize,
    incomplete: usize,
    frames: usize,
    max_volume_error: Option<f64>,
    last_frame: Vec<VoronoiCell>,
}

impl VoronoiAnalysis {
    pub fn new(params: VoronoiParams, cutoff: f64) -> Result<Self> {
        if !(cutoff > 0.0) {
            return Err(MdlabError::InvalidArgument(format!(
                "Voronoi cutoff must be positive, got {}",
                cutoff
            )));
        }
        if params.face_area_threshold < 0.0 || params.edge_threshold < 0.0 {
            return Err(MdlabError::InvalidArgument(
                "Voronoi thresholds must be non-negative".to_string(),
            ));
        }
        Ok(VoronoiAnalysis {
            params,
            cutoff,
            histogram: HashMap::new(),
            species: Vec::new(),
            volume_sums: Vec::new(),
            cells: 0,
            incomplete: 0,
            frames: 0,
            max_volume_error: None,
            last_frame: Vec::new(),
        })
    }
}

impl FrameAnalysis for VoronoiAnalysis {
    type Output = VoronoiSummary;

    fn name(&self) -> &str {
        "voronoi"
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn accumulate(&mut self, frame: &Frame, neighbors: &NeighborList) -> Result<()> {
        let cells = tessellate(frame, neighbors, &self.params);

        let incomplete = cells.iter().filter(|c| c.incomplete).count();
        if incomplete == 0 {
            let total: f64 = cells.iter().map(|c| c.volume).sum();
            let box_volume = frame.lattice.volume().abs();
            let err = (total - box_volume).abs() / box_volume;
            self.max_volume_error = Some(self.max_volume_error.map_or(err, |e| e.max(err)));
            if err > 1e-6 {
                log::warn!(
                    "Voronoi volumes of '{}' sum to {:.6} but the box is {:.6}",
                    frame.name,
                    total,
                    box_volume
                );
            }
        } else {
            log::warn!(
                "{} of {} Voronoi cells in '{}' are incomplete; increase the cutoff ({:.3} Å)",
                incomplete,
                cells.len(),
                frame.name,
                self.cutoff
            );
        }

        for cell in &cells {
            let s = match self.species.iter().position(|s| *s == cell.element) {
                Some(s) => s,
                None => {
                    self.species.push(cell.element.clone());
                    self.volume_sums.push((0.0, 0));
                    self.species.len() - 1
                }
            };
            self.volume_sums[s].0 += cell.volume;
            self.volume_sums[s].1 += 1;
            *self.histogram.entry(cell.index).or_insert(0) += 1;
        }

        self.cells += cells.len();
        self.incomplete += incomplete;
        self.frames += 1;
        self.last_frame = cells;
        Ok(())
    }

    fn finish(self) -> Result<VoronoiSummary> {
        let mut histogram: Vec<(VoronoiIndex, usize)> = self.histogram.into_iter().collect();
        histogram.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let species_volumes = self
            .species
            .into_iter()
            .zip(self.volume_sums)
            .map(|(s, (sum, n))| (s, sum / n.max(1) as f64, n))
            .collect();

        Ok(VoronoiSummary {
            histogram,
            species_volumes,
            cells: self.cells,
            incomplete: self.incomplete,
            frames: self.frames,
            max_volume_error: self.max_volume_error,
            last_frame: self.last_frame,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FrameSelection, Trajectory};
    use crate::pipeline;
    use crate::test_support::{bcc, fcc, random_frame};

    fn run_voronoi(frame: Frame, cutoff: Option<f64>) -> VoronoiSummary {
        let rc = cutoff.unwrap_or_else(|| default_cutoff(&frame));
        let analysis = VoronoiAnalysis::new(VoronoiParams::default(), rc).unwrap();
        pipeline::run(&Trajectory::single(frame), &FrameSelection::default(), analysis, None).unwrap()
    }

    #[test]
    fn test_fcc_rhombic_dodecahedron() {
        let a = 4.05;
        let summary = run_voronoi(fcc(a, 3, "Al"), None);
        assert_eq!(summary.incomplete, 0);
        assert_eq!(summary.histogram.len(), 1);
        assert_eq!(summary.histogram[0].0, VoronoiIndex([0, 12, 0, 0, 0]));
        assert_eq!(summary.histogram[0].0.to_string(), "<0,12,0,0>");

        for cell in &summary.last_frame {
            assert!((cell.volume - a * a * a / 4.0).abs() < 1e-8);
            assert_eq!(cell.neighbors.len(), 12);
        }
        assert!(summary.max_volume_error.unwrap() < 1e-6);
    }

    #[test]
    fn test_bcc_truncated_octahedron() {
        let a = 3.0;
        let summary = run_voronoi(bcc(a, 4, "Fe"), None);
        assert_eq!(summary.incomplete, 0);
        assert_eq!(summary.histogram[0].0, VoronoiIndex([0, 6, 0, 8, 0]));
        assert_eq!(summary.histogram[0].1, 128);
        let (el, mean_volume, n) = &summary.species_volumes[0];
        assert_eq!(el, "Fe");
        assert_eq!(*n, 128);
        assert!((mean_volume - a * a * a / 2.0).abs() < 1e-8);
    }

    #[test]
    fn test_random_volumes_fill_box() {
        let frame = random_frame(200, 12.0, &["Cu", "Zr"], 21);
        let summary = run_voronoi(frame, Some(6.5));
        assert_eq!(summary.incomplete, 0);
        assert!(summary.max_volume_error.unwrap() < 1e-6);
        let cells: usize = summary.histogram.iter().map(|(_, n)| n).sum();
        assert_eq!(cells, 200);
        for cell in &summary.last_frame {
            // 每个面对应一个近邻
            assert_eq!(cell.neighbors.len(), cell.index.faces());
        }
    }

    #[test]
    fn test_small_cutoff_is_incomplete() {
        let summary = run_voronoi(fcc(4.05, 3, "Al"), Some(2.0));
        assert_eq!(summary.incomplete, 108);
        assert!(summary.max_volume_error.is_none());
    }

    #[test]
    fn test_area_threshold_drops_small_faces() {
        let frame = random_frame(200, 12.0, &["Cu"], 4);
        let nl = NeighborList::build(&frame, 6.5).unwrap();
        let all = tessellate(&frame, &nl, &VoronoiParams::default());
        let strict = tessellate(
            &frame,
            &nl,
            &VoronoiParams {
                face_area_threshold: 0.02,
                ..Default::default()
            },
        );
        let faces_all: usize = all.iter().map(|c| c.index.faces()).sum();
        let faces_strict: usize = strict.iter().map(|c| c.index.faces()).sum();
        assert!(faces_strict < faces_all);
        // 体积不受面阈值影响
        assert!((all[0].volume - strict[0].volume).abs() < 1e-12);
    }
}
