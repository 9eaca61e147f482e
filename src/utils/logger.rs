//! # 日志后端
//!
//! 将 `log` 宏的输出转成与 `utils/output.rs` 一致的彩色前缀格式。
//!
//! 级别：默认 warn；`-v` info，`-vv` debug，`-vvv` trace；
//! 环境变量 `MDLAB_LOG`（error/warn/info/debug/trace/off）优先于 `-v`。
//!
//! ## 依赖关系
//! - 被 `main.rs` 初始化
//! - 使用 `log`, `colored` crate

use colored::Colorize;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// 控制日志级别的环境变量
pub const LOG_ENV: &str = "MDLAB_LOG";

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!("{} {}", "[ERR]".red().bold(), record.args()),
            Level::Warn => eprintln!("{} {}", "[WARN]".yellow().bold(), record.args()),
            Level::Info => eprintln!("{} {}", "[*]".blue().bold(), record.args()),
            Level::Debug | Level::Trace => eprintln!(
                "{} {}",
                format!("[{}]", record.target()).dimmed(),
                record.args()
            ),
        }
    }

    fn flush(&self) {}
}

/// `-v` 次数对应的级别
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// 综合环境变量与 `-v` 决定级别
pub fn resolve_level(verbose: u8, env: Option<&str>) -> LevelFilter {
    env.and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or_else(|| level_from_verbosity(verbose))
}

/// 安装全局日志后端（重复调用无副作用）
pub fn init(verbose: u8) {
    let env = std::env::var(LOG_ENV).ok();
    let level = resolve_level(verbose, env.as_deref());
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(level_from_verbosity(0), LevelFilter::Warn);
        assert_eq!(level_from_verbosity(1), LevelFilter::Info);
        assert_eq!(level_from_verbosity(2), LevelFilter::Debug);
        assert_eq!(level_from_verbosity(7), LevelFilter::Trace);
    }

    #[test]
    fn test_env_overrides_flag() {
        assert_eq!(resolve_level(0, Some("debug")), LevelFilter::Debug);
        assert_eq!(resolve_level(3, Some("off")), LevelFilter::Off);
        // 无法识别时回退到 -v
        assert_eq!(resolve_level(1, Some("loud")), LevelFilter::Info);
        assert_eq!(resolve_level(1, None), LevelFilter::Info);
    }
}
