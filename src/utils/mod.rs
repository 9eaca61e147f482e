//! # 工具函数模块
//!
//! 提供美化输出、进度条与日志后端。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/` 与 `main.rs` 使用
//! - 子模块: output, progress, logger

pub mod logger;
pub mod output;
pub mod progress;
