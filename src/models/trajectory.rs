//! # 轨迹数据模型
//!
//! 多帧结构的容器，以及分析时使用的帧选择。
//!
//! ## 依赖关系
//! - 被 `parsers/` 产出，被 `pipeline` 消费
//! - 使用 `models/structure.rs`

use crate::error::{MdlabError, Result};
use crate::models::Frame;

/// 轨迹（按读入顺序排列的帧）
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    pub frames: Vec<Frame>,
}

impl Trajectory {
    pub fn new(frames: Vec<Frame>) -> Self {
        Trajectory { frames }
    }

    pub fn single(frame: Frame) -> Self {
        Trajectory {
            frames: vec![frame],
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> Option<&Frame> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// 所有帧的 timestep
    pub fn timesteps(&self) -> Vec<Option<u64>> {
        self.frames.iter().map(|f| f.timestep).collect()
    }

    /// 按 timestep 查找帧
    pub fn frame_at_timestep(&self, timestep: u64) -> Result<&Frame> {
        self.frames
            .iter()
            .find(|f| f.timestep == Some(timestep))
            .ok_or(MdlabError::TimestepNotFound(timestep))
    }

    /// 选中的帧
    pub fn select(&self, selection: &FrameSelection) -> Result<Vec<&Frame>> {
        let indices = selection.indices(self.frames.len());
        if indices.is_empty() {
            return Err(MdlabError::EmptySelection {
                frames: self.frames.len(),
            });
        }
        Ok(indices.into_iter().map(|i| &self.frames[i]).collect())
    }

    /// 检查每帧原子数一致
    pub fn check_consistent(&self) -> Result<()> {
        let Some(first) = self.frames.first() else {
            return Ok(());
        };
        let expected = first.atoms.len();
        for (i, frame) in self.frames.iter().enumerate() {
            if frame.atoms.len() != expected {
                return Err(MdlabError::InconsistentAtomCount {
                    frame: i,
                    expected,
                    found: frame.atoms.len(),
                });
            }
        }
        Ok(())
    }

    /// 平均数密度
    pub fn mean_number_density(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.frames.iter().map(|f| f.number_density()).sum::<f64>() / self.frames.len() as f64
    }
}

/// 帧选择：[start, stop) 每 stride 取一帧
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSelection {
    pub start: usize,
    pub stop: Option<usize>,
    pub stride: usize,
}

impl Default for FrameSelection {
    fn default() -> Self {
        FrameSelection {
            start: 0,
            stop: None,
            stride: 1,
        }
    }
}

impl FrameSelection {
    /// 仅最后一帧
    pub fn last(n_frames: usize) -> Self {
        FrameSelection {
            start: n_frames.saturating_sub(1),
            stop: None,
            stride: 1,
        }
    }

    /// 解析 "start:stop:stride" 格式（各部分均可省略，如 "10:", "::5"）
    pub fn parse(spec: &str) -> Result<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.is_empty() || parts.len() > 3 {
            return Err(MdlabError::InvalidRange(spec.to_string()));
        }

        let field = |s: &str| -> Result<Option<usize>> {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<usize>()
                    .map(Some)
                    .map_err(|_| MdlabError::InvalidRange(spec.to_string()))
            }
        };

        let start = field(parts[0])?.unwrap_or(0);
        let stop = match parts.get(1) {
            Some(s) => field(s)?,
            // 单个数字表示只取这一帧
            None => Some(start + 1),
        };
        let stride = match parts.get(2) {
            Some(s) => field(s)?.unwrap_or(1),
            None => 1,
        };

        if stride == 0 {
            return Err(MdlabError::InvalidRange(format!(
                "{} (stride must be >= 1)",
                spec
            )));
        }

        Ok(FrameSelection {
            start,
            stop,
            stride,
        })
    }

    /// 在给定帧数下展开为下标
    pub fn indices(&self, n_frames: usize) -> Vec<usize> {
        let stop = self.stop.unwrap_or(n_frames).min(n_frames);
        if self.start >= stop {
            return Vec::new();
        }
        (self.start..stop).step_by(self.stride.max(1)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn frame_at(t: u64, n: usize) -> Frame {
        let atoms = (0..n).map(|_| Atom::new("Ar", [0.0; 3])).collect();
        let mut f = Frame::new("test", Lattice::orthorhombic(10.0, 10.0, 10.0), atoms);
        f.timestep = Some(t);
        f
    }

    #[test]
    fn test_selection_parse() {
        let sel = FrameSelection::parse("10:20:2").unwrap();
        assert_eq!(sel.indices(100), vec![10, 12, 14, 16, 18]);

        let sel = FrameSelection::parse("::5").unwrap();
        assert_eq!(sel.indices(12), vec![0, 5, 10]);

        let sel = FrameSelection::parse("3").unwrap();
        assert_eq!(sel.indices(10), vec![3]);

        assert!(FrameSelection::parse("1:2:0").is_err());
        assert!(FrameSelection::parse("a:b").is_err());
    }

    #[test]
    fn test_selection_clipped_to_length() {
        let sel = FrameSelection::parse("5:").unwrap();
        assert_eq!(sel.indices(7), vec![5, 6]);
        assert!(sel.indices(3).is_empty());
    }

    #[test]
    fn test_frame_at_timestep() {
        let traj = Trajectory::new(vec![frame_at(0, 2), frame_at(100, 2), frame_at(200, 2)]);
        assert_eq!(traj.frame_at_timestep(100).unwrap().timestep, Some(100));
        assert!(matches!(
            traj.frame_at_timestep(50),
            Err(MdlabError::TimestepNotFound(50))
        ));
    }

    #[test]
    fn test_empty_selection_is_error() {
        let traj = Trajectory::new(vec![frame_at(0, 2)]);
        let sel = FrameSelection::parse("4:").unwrap();
        assert!(matches!(
            traj.select(&sel),
            Err(MdlabError::EmptySelection { frames: 1 })
        ));

        let none = Trajectory::new(Vec::new());
        assert!(none.is_empty());
        assert_eq!(none.mean_number_density(), 0.0);
    }

    #[test]
    fn test_inconsistent_atom_count() {
        let traj = Trajectory::new(vec![frame_at(0, 2), frame_at(1, 3)]);
        assert!(traj.check_consistent().is_err());
    }
}
