//! # 分析模块
//!
//! 基于统一结构与近邻列表的结构分析，以及能量-体积拟合。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/` 使用
//! - 使用 `models/`, `neighbors.rs`, `pipeline.rs`
//! - 子模块:
//!   - 对关联：rdf, structure_factor, scattering, smoothing
//!   - 拓扑：voronoi, honeycutt_andersen, bond_angle, warren_cowley
//!   - 能量：eos
//!   - 输出：export, plot

pub mod bond_angle;
pub mod eos;
pub mod export;
pub mod honeycutt_andersen;
pub mod plot;
pub mod rdf;
pub mod scattering;
pub mod smoothing;
pub mod structure_factor;
pub mod voronoi;
pub mod warren_cowley;

pub use bond_angle::{BondAngleAnalysis, BondAngleParams, BondAngleResult};
pub use eos::{fit_birch_murnaghan, BirchMurnaghan, EosFit};
pub use honeycutt_andersen::{HaAnalysis, HaParams, HaSummary};
pub use rdf::{RdfAnalysis, RdfParams, RdfResult};
pub use smoothing::SavitzkyGolay;
pub use structure_factor::{QGrid, Radiation, SqMethod, SqResult};
pub use voronoi::{VoronoiAnalysis, VoronoiParams, VoronoiSummary};
pub use warren_cowley::{WarrenCowleyAnalysis, WarrenCowleyResult};
