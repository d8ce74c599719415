//! # Flick Runtime
//!
//! 点击式互动小说播放器的核心运行时库。
//!
//! ## 架构概述
//!
//! `flick-runtime` 是纯逻辑核心，不依赖任何 IO。
//! 宿主负责解码资源、提供时钟和输入，并消费事件：
//!
//! ```text
//! Host                              Runtime
//!   │                                  │
//!   │──── click(x, y) / skip() ──────►│ pointcast → 行为脚本 → 对话
//!   │──── update(dt) ────────────────►│ 逐字显示 / 延时 / 恢复挂起的脚本
//!   │                                  │
//!   │◄─── Event (next-page / done / next-scene / log) ──│
//!   │◄─── render() → RgbaImage ───────│
//! ```
//!
//! ## 核心类型
//!
//! - [`Player`]：场景、共享变量、对话与交互流程的所有者
//! - [`DialoguePlayer`]：页面队列与逐字显示
//! - [`BehaviorScript`]：对象行为脚本（受限的指令调用语言）
//! - [`Event`] / [`EventSink`]：播放器事件通道
//! - [`Completion`]：一次性完成信号
//!
//! ## 使用示例
//!
//! ```ignore
//! use flick_runtime::{EventSink, Player, PlayerConfig};
//!
//! let events = EventSink::new();
//! let mut player = Player::new(project, drawings, font, PlayerConfig::default(), events.clone())?;
//!
//! loop {
//!     if let Some((x, y)) = host.poll_click() {
//!         player.click(x, y);
//!     }
//!     player.update(dt);
//!
//!     for event in events.drain() {
//!         host.handle(event);
//!     }
//!     host.present(player.render());
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`font`]：位图字体
//! - [`text`]：标记分词、排版、样式、页面光栅化
//! - [`dialogue`]：对话播放器
//! - [`script`]：行为脚本解析与表达式求值
//! - [`runtime`]：能力表、脚本解释器、播放器
//! - [`pointcast`]：像素级点击检测
//! - [`scene`]：项目数据模型
//! - [`diagnostic`]：项目静态检查
//! - [`event`] / [`completion`]：事件与完成信号
//! - [`config`]：播放器配置
//! - [`error`]：错误类型定义

pub mod completion;
pub mod config;
pub mod diagnostic;
pub mod dialogue;
pub mod error;
pub mod event;
pub mod font;
pub mod pointcast;
pub mod runtime;
pub mod scene;
pub mod script;
pub mod state;
pub mod text;

// 重导出核心类型
pub use completion::Completion;
pub use config::{DialogueConfig, PlayerConfig};
pub use diagnostic::{
    Diagnostic, DiagnosticLevel, DiagnosticResult, ReferenceKind, ScriptReference,
    analyze_project, analyze_scene, extract_references,
};
pub use dialogue::DialoguePlayer;
pub use error::{
    ConfigError, FlickError, FlickResult, FontError, PlayerError, RuntimeError, ScriptError,
};
pub use event::{Event, EventSink};
pub use font::{Font, FontChar, parse_runs};
pub use pointcast::{PointcastOptions, draw_order, pointcast};
pub use runtime::{BehaviorTask, Capabilities, ClickOutcome, Player, ScriptScope, TaskStatus};
pub use runtime::player::RESTART_MESSAGE;
pub use scene::{
    Behaviour, DrawingData, DrawingImages, Position, ProjectData, ProjectDetails, Scene,
    SceneObject,
};
pub use script::BehaviorScript;
pub use state::{VarValue, Variables};
pub use text::{LayoutOptions, Page, script_to_pages};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        // 验证公共类型可以从 crate 根使用
        let events = EventSink::new();
        events.log("hello");
        assert_eq!(events.drain(), vec![Event::Log("hello".to_string())]);

        let _config = PlayerConfig::default();
        let _script = BehaviorScript::compile("LOG('x')").unwrap();
        let _vars = Variables::new();
        assert!(Completion::resolved().is_resolved());
    }

    #[test]
    fn test_error_conversions() {
        let err: FlickError = PlayerError::NoScenes.into();
        assert!(err.to_string().contains("没有任何场景"));

        let script_err = BehaviorScript::compile("NOPE()").unwrap_err();
        let err: FlickError = script_err.into();
        assert!(matches!(err, FlickError::Script(ScriptError::UnknownCommand { .. })));
    }
}
