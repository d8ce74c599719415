//! # Completion 模块
//!
//! 一次性完成信号：对话播放完毕、延时结束、对话进入空闲。
//!
//! 同一个 [`Completion`] 可以被克隆给多个等待方；`resolve` 只生效一次。
//! 等待方（行为脚本任务）由帧循环轮询 [`Completion::is_resolved`]。

use std::cell::Cell;
use std::rc::Rc;

/// 一次性完成信号
#[derive(Debug, Clone, Default)]
pub struct Completion {
    resolved: Rc<Cell<bool>>,
}

impl Completion {
    /// 创建未完成的信号
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建已完成的信号
    pub fn resolved() -> Self {
        let completion = Self::new();
        completion.resolve();
        completion
    }

    /// 标记完成，重复调用无效果
    pub fn resolve(&self) {
        self.resolved.set(true);
    }

    /// 是否已完成
    pub fn is_resolved(&self) -> bool {
        self.resolved.get()
    }
}
