//! # 日志上下文
//!
//! 显式传递的日志上下文：携带详细程度和输出端，不使用进程级可变状态。
//!
//! ## 级别
//! - `head`  : verbosity >= 1（阶段标题）
//! - `msg`   : verbosity >= 2（进度细节）
//! - `debug` : verbosity >= 3（逐记录信息）
//! - `warning` / `error` 总是输出
//!
//! 并行构建中只有一个代表 worker 持有未静音的副本，其余 worker 使用 `muted()`。
//!
//! ## 依赖关系
//! - 被 `database/`, `extinction/`, `commands/` 使用
//! - 使用 `utils/output.rs` 作为终端输出端

use crate::utils::output;

#[cfg(test)]
use std::sync::{Arc, Mutex};

/// 日志输出端
#[derive(Debug, Clone)]
enum Sink {
    /// 彩色终端输出
    Terminal,
    /// 写入内存缓冲
    #[cfg(test)]
    Memory(Arc<Mutex<Vec<String>>>),
    /// 丢弃所有消息
    #[cfg(test)]
    Silent,
}

/// 日志上下文
#[derive(Debug, Clone)]
pub struct Log {
    verbosity: u8,
    sink: Sink,
}

impl Log {
    fn new(verbosity: u8, sink: Sink) -> Self {
        Self { verbosity, sink }
    }

    /// 终端日志
    pub fn terminal(verbosity: u8) -> Self {
        Self::new(verbosity, Sink::Terminal)
    }

    /// 完全静默的日志
    #[cfg(test)]
    pub fn silent() -> Self {
        Self::new(0, Sink::Silent)
    }

    /// 写入内存的日志，返回日志与共享缓冲
    #[cfg(test)]
    pub fn memory(verbosity: u8) -> (Self, Arc<Mutex<Vec<String>>>) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        (Self::new(verbosity, Sink::Memory(buffer.clone())), buffer)
    }

    pub fn verbosity(&self) -> u8 {
        self.verbosity
    }

    /// 保留输出端但只输出警告和错误
    pub fn muted(&self) -> Self {
        Self {
            verbosity: 0,
            sink: self.sink.clone(),
        }
    }

    /// 阶段标题
    pub fn head(&self, message: &str) {
        if self.verbosity >= 1 {
            self.emit(Level::Head, message, 0);
        }
    }

    /// 进度细节
    pub fn msg(&self, message: &str, indent: usize) {
        if self.verbosity >= 2 {
            self.emit(Level::Msg, message, indent);
        }
    }

    /// 调试细节
    pub fn debug(&self, message: &str, indent: usize) {
        if self.verbosity >= 3 {
            self.emit(Level::Debug, message, indent);
        }
    }

    /// 可恢复的警告
    pub fn warning(&self, message: &str) {
        self.emit(Level::Warning, message, 0);
    }

    /// 成功消息（与 `head` 同级）
    pub fn success(&self, message: &str) {
        if self.verbosity >= 1 {
            self.emit(Level::Success, message, 0);
        }
    }

    fn emit(&self, level: Level, message: &str, indent: usize) {
        match &self.sink {
            Sink::Terminal => match level {
                Level::Head => output::print_info(message),
                Level::Msg => output::print_detail(message, indent),
                Level::Debug => output::print_debug(message, indent),
                Level::Warning => output::print_warning(message),
                Level::Success => output::print_success(message),
            },
            #[cfg(test)]
            Sink::Memory(buffer) => {
                let tag = match level {
                    Level::Head => "HEAD",
                    Level::Msg => "MSG",
                    Level::Debug => "DEBUG",
                    Level::Warning => "WARN",
                    Level::Success => "OK",
                };
                // 缓冲被毒化时仍然写入，测试需要看到全部消息
                let mut lines = match buffer.lock() {
                    Ok(guard) => guard,
                    Err(poisoned) => poisoned.into_inner(),
                };
                lines.push(format!("[{}] {}{}", tag, " ".repeat(indent), message));
            }
            #[cfg(test)]
            Sink::Silent => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Level {
    Head,
    Msg,
    Debug,
    Warning,
    Success,
}
