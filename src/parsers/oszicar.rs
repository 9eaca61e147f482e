//! # VASP OSZICAR 解析器
//!
//! 提取每个离子步的能量信息。
//!
//! ## 格式说明
//! ```text
//! 弛豫：   1 F= -.14900000E+02 E0= -.14890000E+02  d E =-.149000E+02
//! MD：     1 T=  1000. E= -.12345678E+03 F= -.13345678E+03 E0= -.13340000E+03  EK= 0.10000E+02 SP= 0.00E+00 SK= 0.00E+00
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/info.rs` 使用
//! - 使用 `regex` 匹配 key=value 字段

use crate::error::{MdlabError, Result};

use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// 单个离子步
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IonicStep {
    /// 离子步编号
    pub step: u64,
    /// 自由能 F (eV)
    pub free_energy: f64,
    /// E0 = energy(sigma->0) (eV)
    pub energy_sigma0: Option<f64>,
    /// MD 温度 (K)
    pub temperature: Option<f64>,
    /// MD 总能量 E (eV)
    pub total_energy: Option<f64>,
    /// MD 动能 EK (eV)
    pub kinetic_energy: Option<f64>,
}

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(T|E|F|E0|EK|SP|SK)=\s*([-+]?[0-9]*\.?[0-9]+(?:[Ee][-+]?[0-9]+)?)")
        .expect("static regex")
});

/// 解析 OSZICAR 文件
pub fn parse_oszicar_file(path: &Path) -> Result<Vec<IonicStep>> {
    let content = fs::read_to_string(path).map_err(|e| MdlabError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_oszicar_content(&content, &path.display().to_string())
}

/// 从字符串内容解析 OSZICAR
pub fn parse_oszicar_content(content: &str, name: &str) -> Result<Vec<IonicStep>> {
    let mut steps = Vec::new();

    for line in content.lines() {
        // 离子步行以步数开头，且含有 "F="
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        let Ok(step) = first.parse::<u64>() else {
            continue;
        };
        if !line.contains("F=") {
            continue;
        }

        let mut ionic = IonicStep {
            step,
            ..Default::default()
        };
        let mut has_f = false;

        for cap in FIELD_RE.captures_iter(line) {
            let value: f64 = cap[2]
                .parse()
                .map_err(|_| MdlabError::parse("oszicar", name, format!("Bad number in: {}", line.trim())))?;
            match &cap[1] {
                "F" => {
                    ionic.free_energy = value;
                    has_f = true;
                }
                "E0" => ionic.energy_sigma0 = Some(value),
                "T" => ionic.temperature = Some(value),
                "E" => ionic.total_energy = Some(value),
                "EK" => ionic.kinetic_energy = Some(value),
                _ => {}
            }
        }

        if has_f {
            steps.push(ionic);
        }
    }

    if steps.is_empty() {
        return Err(MdlabError::parse("oszicar", name, "No ionic steps found"));
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relaxation() {
        let content = r#"       N       E                     dE             d eps       ncg     rms          rms(c)
DAV:   1    -0.123456789012E+02   -0.12346E+02   -0.12345E+03   160   0.123E+02
   1 F= -.14900000E+02 E0= -.14890000E+02  d E =-.149000E+02
DAV:   1    -0.123456789012E+02   -0.12346E+02   -0.12345E+03   160   0.123E+02
   2 F= -.14950000E+02 E0= -.14940000E+02  d E =-.500000E-01
"#;
        let steps = parse_oszicar_content(content, "OSZICAR").unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1].step, 2);
        assert!((steps[1].free_energy + 14.95).abs() < 1e-9);
        assert!((steps[1].energy_sigma0.unwrap() + 14.94).abs() < 1e-9);
        assert!(steps[0].temperature.is_none());
    }

    #[test]
    fn test_parse_md() {
        let content = "     1 T=  1000. E= -.12345678E+03 F= -.13345678E+03 E0= -.13340000E+03  EK= 0.10000E+02 SP= 0.00E+00 SK= 0.00E+00\n";
        let steps = parse_oszicar_content(content, "OSZICAR").unwrap();
        assert_eq!(steps.len(), 1);
        assert!((steps[0].temperature.unwrap() - 1000.0).abs() < 1e-9);
        assert!((steps[0].total_energy.unwrap() + 123.45678).abs() < 1e-6);
        assert!((steps[0].kinetic_energy.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_is_error() {
        assert!(parse_oszicar_content("nothing here\n", "OSZICAR").is_err());
    }
}
