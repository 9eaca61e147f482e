//! # 统一分析流程
//!
//! 帧选择 → 每帧构建一次近邻列表 → 交给分析模块累积 → 汇总结果。
//! 所有基于近邻的分析（RDF、键角、HA、Voronoi、Warren-Cowley）都实现 `FrameAnalysis`。
//!
//! ## 依赖关系
//! - 被 `commands/analyze/` 使用
//! - 使用 `models/`, `neighbors.rs`

use crate::error::Result;
use crate::models::{Frame, FrameSelection, Trajectory};
use crate::neighbors::NeighborList;

use indicatif::ProgressBar;

/// 逐帧累积的分析
pub trait FrameAnalysis {
    type Output;

    /// 分析名称（用于日志与进度条）
    fn name(&self) -> &str;

    /// 需要的近邻截断半径 (Å)
    fn cutoff(&self) -> f64;

    /// 累积一帧
    fn accumulate(&mut self, frame: &Frame, neighbors: &NeighborList) -> Result<()>;

    /// 汇总所有帧
    fn finish(self) -> Result<Self::Output>;
}

/// 对选中的帧运行分析
pub fn run<A: FrameAnalysis>(
    trajectory: &Trajectory,
    selection: &FrameSelection,
    mut analysis: A,
    progress: Option<&ProgressBar>,
) -> Result<A::Output> {
    let frames = trajectory.select(selection)?;

    log::info!(
        "{}: {} frame(s) selected, cutoff {:.3} Å",
        analysis.name(),
        frames.len(),
        analysis.cutoff()
    );
    if let Some(pb) = progress {
        pb.set_length(frames.len() as u64);
        pb.set_message(analysis.name().to_string());
    }

    for frame in frames {
        let neighbors = NeighborList::build(frame, analysis.cutoff())?;
        log::debug!(
            "{}: frame '{}' mean coordination {:.2}",
            analysis.name(),
            frame.name,
            neighbors.mean_coordination()
        );
        analysis.accumulate(frame, &neighbors)?;
        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    analysis.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MdlabError;
    use crate::test_support::fcc;

    /// 记录每帧平均配位数
    struct MeanCn {
        values: Vec<f64>,
    }

    impl FrameAnalysis for MeanCn {
        type Output = Vec<f64>;

        fn name(&self) -> &str {
            "mean-cn"
        }

        fn cutoff(&self) -> f64 {
            3.0
        }

        fn accumulate(&mut self, _frame: &Frame, neighbors: &NeighborList) -> Result<()> {
            self.values.push(neighbors.mean_coordination());
            Ok(())
        }

        fn finish(self) -> Result<Vec<f64>> {
            Ok(self.values)
        }
    }

    #[test]
    fn test_run_over_selection() {
        let frame = fcc(4.05, 3, "Al");
        let traj = Trajectory::new(vec![frame.clone(), frame.clone(), frame]);
        let selection = FrameSelection::parse("0::2").unwrap();
        let out = run(&traj, &selection, MeanCn { values: Vec::new() }, None).unwrap();
        assert_eq!(out.len(), 2);
        assert!((out[0] - 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_selection() {
        let traj = Trajectory::new(vec![fcc(4.05, 1, "Al")]);
        let selection = FrameSelection::parse("5:").unwrap();
        let result = run(&traj, &selection, MeanCn { values: Vec::new() }, None);
        assert!(matches!(result, Err(MdlabError::EmptySelection { .. })));
    }
}
