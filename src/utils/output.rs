//! # 终端输出
//!
//! 所有命令共用的状态行、标题栏、键值行与表格。
//! 状态行写到 stdout，`[ERR]` 写到 stderr，便于 `info --json` 之外的
//! 输出与错误分流。
//!
//! ## 依赖关系
//! - 被 `commands/`, `batch/runner.rs`, `main.rs` 使用
//! - 使用 `colored`, `tabled` crate

use colored::{ColoredString, Colorize};
use std::path::Path;
use tabled::settings::Style;
use tabled::{Table, Tabled};

const RULE_WIDTH: usize = 64;

/// 状态行前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Ok,
    Info,
    Warn,
    Skip,
    Done,
    Err,
}

impl Status {
    fn tag(self) -> ColoredString {
        match self {
            Status::Ok => "[OK]".green().bold(),
            Status::Info => "[*]".blue().bold(),
            Status::Warn => "[WARN]".yellow().bold(),
            Status::Skip => "[SKIP]".dimmed(),
            Status::Done => "[DONE]".green().bold(),
            Status::Err => "[ERR]".red().bold(),
        }
    }
}

fn emit(status: Status, msg: &str) {
    if status == Status::Err {
        eprintln!("{} {}", status.tag(), msg);
    } else {
        println!("{} {}", status.tag(), msg);
    }
}

pub fn print_success(msg: &str) {
    emit(Status::Ok, msg);
}

pub fn print_error(msg: &str) {
    emit(Status::Err, msg);
}

pub fn print_warning(msg: &str) {
    emit(Status::Warn, msg);
}

pub fn print_info(msg: &str) {
    emit(Status::Info, msg);
}

pub fn print_skip(msg: &str) {
    emit(Status::Skip, msg);
}

pub fn print_done(msg: &str) {
    emit(Status::Done, msg);
}

/// `输入 -> 输出` 形式的转换记录
pub fn print_conversion(from: &Path, to: &Path) {
    println!(
        "{} {} {} {}",
        Status::Ok.tag(),
        from.display().to_string().dimmed(),
        "->".cyan(),
        to.display()
    );
}

/// 命令标题栏
pub fn print_header(title: &str) {
    let rule = "─".repeat(RULE_WIDTH).dimmed();
    println!("\n{}\n  {}\n{}\n", rule, title.bold(), rule);
}

pub fn print_separator() {
    println!("{}", "─".repeat(RULE_WIDTH).dimmed());
}

/// 打印对齐的键值行（分析结果摘要）
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<22} {}", format!("{}:", key).cyan(), value);
}

/// 圆角表格
pub fn print_table<T: Tabled>(rows: &[T]) {
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}
