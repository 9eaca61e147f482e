//! # 文件收集器
//!
//! 根据输入路径和模式收集待处理文件列表。
//!
//! ## 功能
//! - 支持单文件和目录输入
//! - `glob` 模式匹配（逗号分隔的多个模式，匹配文件名）
//! - 可选递归目录搜索，结果按路径排序
//!
//! ## 依赖关系
//! - 被 `commands/convert.rs`, `commands/info.rs`, `commands/analyze/eos.rs` 调用
//! - 使用 `walkdir` 遍历目录，`glob` 匹配文件名

use crate::error::{MdlabError, Result};

use glob::Pattern;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 文件收集器
#[derive(Debug, Clone)]
pub struct FileCollector {
    input: PathBuf,
    patterns: Vec<Pattern>,
    recursive: bool,
}

impl FileCollector {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            patterns: Vec::new(),
            recursive: false,
        }
    }

    /// 设置匹配模式（逗号分隔的多模式）
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.patterns = pattern
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                Pattern::new(s).map_err(|e| {
                    MdlabError::InvalidArgument(format!("Invalid pattern '{}': {}", s, e))
                })
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn is_single_file(&self) -> bool {
        self.input.is_file()
    }

    /// 收集所有匹配的文件；单文件输入不做模式过滤
    pub fn collect(&self) -> Result<Vec<PathBuf>> {
        if self.input.is_file() {
            return Ok(vec![self.input.clone()]);
        }
        if !self.input.is_dir() {
            return Err(MdlabError::FileNotFound {
                path: self.input.display().to_string(),
            });
        }

        let walker = if self.recursive {
            WalkDir::new(&self.input)
        } else {
            WalkDir::new(&self.input).max_depth(1)
        };

        let mut files: Vec<PathBuf> = walker
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| self.matches(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();
        files.sort();

        log::debug!(
            "Collected {} file(s) under {}",
            files.len(),
            self.input.display()
        );
        Ok(files)
    }

    fn matches(&self, path: &Path) -> bool {
        if self.patterns.is_empty() {
            return true;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|p| p.matches(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mdlab_collect_{}_{}", std::process::id(), name));
        fs::create_dir_all(dir.join("sub")).unwrap();
        for f in ["POSCAR", "POSCAR_002", "dump.melt", "notes.txt", "sub/CONTCAR"] {
            fs::write(dir.join(f), "x").unwrap();
        }
        dir
    }

    #[test]
    fn test_patterns_and_recursion() {
        let dir = scratch_dir("patterns");

        let flat = FileCollector::new(&dir)
            .with_pattern("POSCAR*, CONTCAR*")
            .unwrap()
            .collect()
            .unwrap();
        assert_eq!(flat.len(), 2);

        let deep = FileCollector::new(&dir)
            .with_pattern("POSCAR*,CONTCAR*")
            .unwrap()
            .recursive(true)
            .collect()
            .unwrap();
        assert_eq!(deep.len(), 3);

        let all = FileCollector::new(&dir).collect().unwrap();
        assert_eq!(all.len(), 4);

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_single_file_and_missing_input() {
        let dir = scratch_dir("single");
        let single = FileCollector::new(dir.join("notes.txt"))
            .with_pattern("*.res")
            .unwrap();
        assert!(single.is_single_file());
        assert_eq!(single.collect().unwrap().len(), 1);
        fs::remove_dir_all(&dir).ok();

        assert!(FileCollector::new("/nonexistent/mdlab").collect().is_err());
        assert!(FileCollector::new(".").with_pattern("[").is_err());
    }
}
