//! # Capability 模块
//!
//! 行为脚本能看到的全部能力。
//!
//! 脚本只能通过 [`Capabilities`] 影响外部世界，没有其它入口。
//! 每次调用都带着 [`ScriptScope`]（当前对象 / 场景），
//! 省略对象或场景参数的指令作用于它。

use crate::completion::Completion;
use crate::error::RuntimeError;
use crate::state::{VarValue, Variables};

/// 单次调用的作用域
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptScope {
    /// 被点击的对象 id
    pub object_id: String,
    /// 对象所在场景 id
    pub scene_id: String,
}

impl ScriptScope {
    pub fn new(object_id: impl Into<String>, scene_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
            scene_id: scene_id.into(),
        }
    }
}

/// 能力表
///
/// 可等待的能力返回 [`Completion`]；脚本使用 `await` 时在其完成前挂起。
pub trait Capabilities {
    /// 共享变量
    fn variables(&self) -> &Variables;

    /// `SET`
    fn set_variable(&mut self, name: &str, value: VarValue);

    /// `LOG`
    fn log(&mut self, text: String);

    /// `RESKIN`：更换对象的绘图
    fn reskin(&mut self, scene: &str, object: &str, drawing: &str) -> Result<(), RuntimeError>;

    /// `SHOW` / `HIDE`
    fn set_hidden(&mut self, scene: &str, object: &str, hidden: bool) -> Result<(), RuntimeError>;

    /// `TRANSFER`：切换场景
    fn transfer(&mut self, scene: &str) -> Result<(), RuntimeError>;

    /// `SAY`：排队对话文本，完成于这段文本的最后一页离开
    fn say(&mut self, text: &str) -> Completion;

    /// `DELAY`：延时（秒）
    fn delay(&mut self, seconds: f64) -> Completion;

    /// `DIALOGUE`：等待对话空闲
    fn dialogue_idle(&mut self) -> Completion;

    /// `RESET_OBJECT`：恢复对象的初始数据
    fn reset_object(&mut self, scene: &str, object: &str) -> Result<(), RuntimeError>;

    /// `RESET_SCENE`：恢复场景的初始数据
    fn reset_scene(&mut self, scene: &str) -> Result<(), RuntimeError>;

    /// `RESET_GAME`：重启游戏
    fn reset_game(&mut self);
}
