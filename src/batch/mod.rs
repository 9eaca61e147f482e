//! # 批量文件处理
//!
//! `convert` 的目录输入与 `analyze eos` 的 OUTCAR 扫描共用：
//! [`FileCollector`] 按 glob 模式收集文件，[`BatchRunner`] 用 rayon 并行处理，
//! 每个文件给出 [`Outcome`]，最后汇总为 `BatchReport`。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`, `commands/analyze/eos.rs` 使用
//! - 使用 `walkdir`, `glob`, `rayon`, `indicatif`

pub mod collector;
pub mod runner;

pub use collector::FileCollector;
pub use runner::{BatchRunner, Outcome};
