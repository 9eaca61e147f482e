//! # 进度条工具
//!
//! 两种样式：批量文件用的计数条，逐帧分析用的帧进度条；
//! 读取大轨迹时用 spinner。
//! 模板是静态字符串，`with_template` 只会在模板写错时失败。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/runner.rs`, `pipeline.rs` 使用
//! - 使用 `indicatif` crate

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const FILE_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({eta}) {msg}";
const FRAME_TEMPLATE: &str =
    "{spinner:.green} {msg:>18} [{bar:40.green/white}] frame {pos}/{len} ({per_sec})";

/// 批量文件处理进度条
pub fn create_progress_bar(len: u64, message: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template(FILE_TEMPLATE)
            .expect("static template")
            .progress_chars("#>-"),
    );
    pb.set_message(message.to_string());
    pb
}

/// 逐帧分析进度条；长度由 `pipeline::run` 按选中帧数设置
pub fn create_frame_bar(analysis: &str) -> ProgressBar {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template(FRAME_TEMPLATE)
            .expect("static template")
            .progress_chars("=> "),
    );
    pb.set_message(analysis.to_string());
    pb
}

/// 创建 spinner（读取轨迹等不确定进度的任务）
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {elapsed_precise} {msg}")
            .expect("static template")
            .tick_strings(&["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"]),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        assert!(ProgressStyle::with_template(FILE_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(FRAME_TEMPLATE).is_ok());
    }

    #[test]
    fn test_frame_bar_starts_empty() {
        let pb = create_frame_bar("rdf");
        assert_eq!(pb.length(), Some(0));
        assert_eq!(pb.message(), "rdf");
    }
}
