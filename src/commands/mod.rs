//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `config.rs`, `parsers/`, `analysis/`, `utils/`
//! - 子模块: info, convert, analyze

pub mod analyze;
pub mod convert;
pub mod info;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::error::Result;

/// 各命令共享的运行环境
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub config: Config,
    /// 并行作业数（0 = 全部核心）
    pub jobs: usize,
}

impl Context {
    /// 命令行给出元素列表时优先，否则取配置文件
    pub fn elements(&self, cli: &[String]) -> Vec<String> {
        if !cli.is_empty() {
            return cli.to_vec();
        }
        self.config.input.elements.clone().unwrap_or_default()
    }
}

/// 执行命令
pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    let threads = if cli.jobs == 0 { num_cpus::get() } else { cli.jobs };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
    log::debug!("Using {} worker thread(s)", threads);

    let ctx = Context {
        config,
        jobs: cli.jobs,
    };

    match cli.command {
        Commands::Info(args) => info::execute(args, &ctx),
        Commands::Convert(args) => convert::execute(args, &ctx),
        Commands::Analyze(args) => analyze::execute(args, &ctx),
    }
}
