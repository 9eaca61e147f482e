//! # mdlab - 分子动力学 / 第一性原理模拟结果分析工具
//!
//! 读取 VASP、LAMMPS、RMC++、Voro++ 等格式，统一成同一种结构表示，
//! 再在近邻列表之上做结构统计分析。
//!
//! ## 子命令
//! - `info`    - 结构、轨迹与计算输出文件概要
//! - `convert` - 结构/轨迹格式转换（POSCAR, XYZ, LAMMPS data, RMC++, Voro++）
//! - `analyze` - 分析功能
//!   - `rdf`, `sq` - 径向分布函数与结构因子
//!   - `bad`, `ha`, `voronoi`, `voro-stats`, `wc` - 局部结构与化学序
//!   - `eos` - 状态方程拟合
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── config.rs   (TOML 配置文件)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── batch/      (批量文件处理)
//!   │     ├── parsers/    (格式解析器与写出器)
//!   │     ├── pipeline.rs (逐帧分析流程)
//!   │     ├── analysis/   (各项分析)
//!   │     ├── neighbors.rs(周期性近邻列表)
//!   │     └── models/     (数据模型)
//!   ├── utils/      (终端输出、进度条、日志)
//!   └── error.rs    (错误处理)
//! ```

mod analysis;
mod batch;
mod cli;
mod commands;
mod config;
mod error;
mod models;
mod neighbors;
mod parsers;
mod pipeline;
mod utils;

#[cfg(test)]
mod test_support;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::logger::init(cli.verbose);

    if let Err(e) = commands::run(cli) {
        let report = anyhow::Error::from(e);
        utils::output::print_error(&format!("{:#}", report));
        std::process::exit(1);
    }
}
