//! # 数据模型模块
//!
//! 定义统一的原子结构、轨迹与能量-体积数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `neighbors`, `analysis/` 和 `commands/` 使用
//! - 子模块: structure, trajectory, energetics

pub mod energetics;
pub mod structure;
pub mod trajectory;

pub use energetics::EnergyPoint;
pub use structure::{cross, dot, norm, wrap_unit, Atom, Frame, Lattice};
pub use trajectory::{FrameSelection, Trajectory};
