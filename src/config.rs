//! # 配置文件
//!
//! 可选的 TOML 配置文件，提供各分析的默认参数。
//! 优先级：命令行参数 > 配置文件 > 内置默认值。
//!
//! ```toml
//! [input]
//! elements = ["Al", "Sm"]
//!
//! [rdf]
//! cutoff = 10.0
//! bins = 200
//! smooth_window = 9
//!
//! [sq]
//! q_max = 15.0
//! method = "faber-ziman"
//! radiation = "neutron"
//!
//! [neighbors]
//! cutoff = 3.6
//!
//! [voronoi]
//! face_area_threshold = 0.01
//!
//! [output]
//! dir = "results"
//! svg = true
//! ```
//!
//! ## 依赖关系
//! - 被 `main.rs` 与 `commands/` 使用
//! - 使用 `serde` + `toml` 反序列化

use crate::analysis::structure_factor::{Radiation, SqMethod};
use crate::error::{MdlabError, Result};

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub input: InputConfig,
    pub rdf: RdfConfig,
    pub sq: SqConfig,
    pub neighbors: NeighborsConfig,
    pub voronoi: VoronoiConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// LAMMPS/RMC++ 类型编号对应的元素
    pub elements: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RdfConfig {
    pub cutoff: Option<f64>,
    pub bins: Option<usize>,
    pub smooth: Option<bool>,
    pub smooth_window: Option<usize>,
    pub smooth_order: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SqConfig {
    pub q_min: Option<f64>,
    pub q_max: Option<f64>,
    pub points: Option<usize>,
    pub method: Option<SqMethod>,
    pub radiation: Option<Radiation>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NeighborsConfig {
    /// 成键截断（键角、HA、Warren-Cowley）
    pub cutoff: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoronoiConfig {
    pub cutoff: Option<f64>,
    pub face_area_threshold: Option<f64>,
    pub edge_threshold: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: Option<PathBuf>,
    pub svg: Option<bool>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Config {
    /// 读取配置文件；未指定路径时返回默认配置
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Config::default());
        };
        if !path.exists() {
            return Err(MdlabError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::from_toml_str(&content, &path.display().to_string())?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str, name: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| MdlabError::ConfigError {
            path: name.to_string(),
            source: e,
        })
    }
}

/// 命令行 > 配置文件 > 默认值
pub fn pick<T>(cli: Option<T>, file: Option<T>, default: T) -> T {
    cli.or(file).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let text = r#"
[input]
elements = ["Al", "Sm"]

[rdf]
cutoff = 10.0
bins = 200
smooth = false

[sq]
q_max = 15.0
method = "faber-ziman"
radiation = "neutron"

[neighbors]
cutoff = 3.6

[voronoi]
face_area_threshold = 0.01

[output]
dir = "results"
svg = true
"#;
        let config = Config::from_toml_str(text, "test.toml").unwrap();
        assert_eq!(config.input.elements, Some(vec!["Al".to_string(), "Sm".to_string()]));
        assert_eq!(config.rdf.cutoff, Some(10.0));
        assert_eq!(config.rdf.bins, Some(200));
        assert_eq!(config.rdf.smooth, Some(false));
        assert_eq!(config.rdf.smooth_window, None);
        assert_eq!(config.sq.method, Some(SqMethod::FaberZiman));
        assert_eq!(config.sq.radiation, Some(Radiation::Neutron));
        assert_eq!(config.neighbors.cutoff, Some(3.6));
        assert_eq!(config.voronoi.face_area_threshold, Some(0.01));
        assert_eq!(config.output.dir, Some(PathBuf::from("results")));
        assert_eq!(config.output.svg, Some(true));
    }

    #[test]
    fn test_empty_and_partial() {
        assert_eq!(Config::from_toml_str("", "empty").unwrap(), Config::default());
        let config = Config::from_toml_str("[rdf]\nbins = 50\n", "p").unwrap();
        assert_eq!(config.rdf.bins, Some(50));
        assert_eq!(config.sq, SqConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = Config::from_toml_str("[rdf]\nbinz = 50\n", "typo.toml").unwrap_err();
        assert!(matches!(err, MdlabError::ConfigError { .. }));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(pick(Some(1), Some(2), 3), 1);
        assert_eq!(pick(None, Some(2), 3), 2);
        assert_eq!(pick(None::<i32>, None, 3), 3);
        assert!(Config::load(None).is_ok());
        assert!(Config::load(Some(Path::new("/nonexistent/mdlab.toml"))).is_err());
    }
}
