//! # Runtime 模块
//!
//! 播放器核心：点击 → 行为脚本 → 对话 → 场景切换。
//!
//! ## 模块结构
//!
//! - [`capability`]：脚本可调用的能力表
//! - [`sandbox`]：可恢复的脚本解释器
//! - [`player`]：拥有场景、对话与交互流程的播放器

pub mod capability;
pub mod player;
pub mod sandbox;

pub use capability::{Capabilities, ScriptScope};
pub use player::{ClickOutcome, Player};
pub use sandbox::{BehaviorTask, TaskStatus};
