//! # Host 层
//!
//! flick 播放器的无界面宿主实现。
//!
//! ## 架构说明
//!
//! Host 层负责：
//! - 配置加载
//! - 项目 / 字体文件读取与 PNG data URL 解码
//! - 时钟（固定帧长）与模拟输入
//! - 事件记录与帧导出
//!
//! Host 层不包含脚本逻辑，只驱动 `flick-runtime` 的 [`Player`](flick_runtime::Player)。

pub mod assets;
pub mod config;
pub mod session;

pub use assets::{
    AssetError, FontSpec, LoadedProject, decode_data_url, decode_drawings, encode_data_url,
    load_font, load_project,
};
pub use config::{AppConfig, ConfigError};
pub use session::{ClickPoint, HeadlessSession, Settled, describe};
