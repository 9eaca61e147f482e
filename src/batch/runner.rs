//! # 批量执行器
//!
//! 在 rayon 线程池中并行处理文件列表，逐个文件报告成功/跳过/失败。
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`, `commands/info.rs`, `commands/analyze/eos.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::Result;
use crate::utils::{output, progress};

use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// 单个文件的处理结果
#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Done(T),
    /// 跳过（如输出已存在），附原因
    Skipped(String),
}

/// 批量处理汇总
#[derive(Debug)]
pub struct BatchReport<T> {
    /// 按输入顺序排列的成功结果
    pub done: Vec<(PathBuf, T)>,
    pub skipped: Vec<(PathBuf, String)>,
    pub failed: Vec<(PathBuf, String)>,
}

impl<T> Default for BatchReport<T> {
    fn default() -> Self {
        BatchReport {
            done: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> BatchReport<T> {
    pub fn total(&self) -> usize {
        self.done.len() + self.skipped.len() + self.failed.len()
    }

    /// 一行汇总
    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} skipped, {} failed (of {})",
            self.done.len(),
            self.skipped.len(),
            self.failed.len(),
            self.total()
        )
    }
}

/// 批量执行器
pub struct BatchRunner {
    jobs: usize,
    message: String,
    show_progress: bool,
}

impl BatchRunner {
    /// `jobs` 为 0 时使用全部核心
    pub fn new(jobs: usize, message: &str) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            message: message.to_string(),
            show_progress: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    /// 并行处理文件列表，失败不会中断其他文件
    pub fn run<T, F>(&self, files: &[PathBuf], processor: F) -> BatchReport<T>
    where
        T: Send,
        F: Fn(&Path) -> Result<Outcome<T>> + Sync + Send,
    {
        let pb = if self.show_progress {
            progress::create_progress_bar(files.len() as u64, &self.message)
        } else {
            indicatif::ProgressBar::hidden()
        };

        let work = || -> Vec<(PathBuf, Result<Outcome<T>>)> {
            files
                .par_iter()
                .map(|file| {
                    let result = processor(file);
                    if let Err(e) = &result {
                        pb.suspend(|| output::print_error(&format!("{}: {}", file.display(), e)));
                    }
                    pb.inc(1);
                    (file.clone(), result)
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!("Falling back to the global thread pool: {}", e);
                work()
            }
        };

        pb.finish_and_clear();

        let mut report = BatchReport::default();
        for (path, result) in results {
            match result {
                Ok(Outcome::Done(value)) => report.done.push((path, value)),
                Ok(Outcome::Skipped(reason)) => report.skipped.push((path, reason)),
                Err(e) => report.failed.push((path, e.to_string())),
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MdlabError;

    #[test]
    fn test_outcomes_are_sorted_into_report() {
        let files: Vec<PathBuf> = (0..9).map(|i| PathBuf::from(format!("f{}", i))).collect();
        let report = BatchRunner::new(2, "test").quiet().run(&files, |p| {
            let n: usize = p.to_string_lossy()[1..].parse().unwrap();
            match n % 3 {
                0 => Ok(Outcome::Done(n * 10)),
                1 => Ok(Outcome::Skipped("exists".to_string())),
                _ => Err(MdlabError::Other("boom".to_string())),
            }
        });

        assert_eq!(report.total(), 9);
        assert_eq!(report.done.len(), 3);
        assert_eq!(report.skipped.len(), 3);
        assert_eq!(report.failed.len(), 3);
        // par_iter().collect() 保持输入顺序
        let values: Vec<usize> = report.done.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 30, 60]);
        assert_eq!(report.summary(), "3 succeeded, 3 skipped, 3 failed (of 9)");
    }
}
