//! # Config 模块
//!
//! 播放器的几何与播放参数。
//!
//! 所有字段都有默认值，配置文件中只需写出要覆盖的部分：
//!
//! ```json
//! { "dialogue": { "line_count": 3, "char_delay": 0.02 } }
//! ```

use image::Rgba;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::text::{LayoutOptions, parse_color};

/// 播放器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// 场景画布宽度
    #[serde(default = "default_scene_width")]
    pub scene_width: u32,

    /// 场景画布高度
    #[serde(default = "default_scene_height")]
    pub scene_height: u32,

    /// 对话框配置
    #[serde(default)]
    pub dialogue: DialogueConfig,
}

/// 对话框配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// 每页行数
    #[serde(default = "default_line_count")]
    pub line_count: usize,

    /// 每行像素宽度
    #[serde(default = "default_line_width")]
    pub line_width: u32,

    /// 对话框内边距
    #[serde(default = "default_padding")]
    pub padding: u32,

    /// 行间距
    #[serde(default = "default_line_gap")]
    pub line_gap: u32,

    /// 逐字显示间隔（秒），可被 `delay` 样式覆盖
    #[serde(default = "default_char_delay")]
    pub char_delay: f64,

    /// 对话框背景色
    #[serde(default = "default_background")]
    pub background: String,

    /// 默认文字颜色
    #[serde(default = "default_text_color")]
    pub text_color: String,
}

// 默认值函数
fn default_scene_width() -> u32 {
    160
}

fn default_scene_height() -> u32 {
    100
}

fn default_line_count() -> usize {
    2
}

fn default_line_width() -> u32 {
    144
}

fn default_padding() -> u32 {
    8
}

fn default_line_gap() -> u32 {
    crate::text::DEFAULT_LINE_GAP
}

fn default_char_delay() -> f64 {
    0.05
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_text_color() -> String {
    "#ffffff".to_string()
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            scene_width: default_scene_width(),
            scene_height: default_scene_height(),
            dialogue: DialogueConfig::default(),
        }
    }
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            line_count: default_line_count(),
            line_width: default_line_width(),
            padding: default_padding(),
            line_gap: default_line_gap(),
            char_delay: default_char_delay(),
            background: default_background(),
            text_color: default_text_color(),
        }
    }
}

impl PlayerConfig {
    /// 验证配置，返回第一个错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scene_width == 0 || self.scene_height == 0 {
            return Err(ConfigError::InvalidSceneSize {
                width: self.scene_width,
                height: self.scene_height,
            });
        }
        self.dialogue.validate()
    }
}

impl DialogueConfig {
    /// 验证配置，返回第一个错误
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.line_count == 0 {
            return Err(ConfigError::ZeroDialogueSize {
                field: "line_count",
            });
        }
        if self.line_width == 0 {
            return Err(ConfigError::ZeroDialogueSize {
                field: "line_width",
            });
        }
        if !self.char_delay.is_finite() || self.char_delay < 0.0 {
            return Err(ConfigError::InvalidCharDelay {
                value: self.char_delay,
            });
        }
        for (field, value) in [
            ("background", &self.background),
            ("text_color", &self.text_color),
        ] {
            if parse_color(value).is_none() {
                return Err(ConfigError::InvalidColor {
                    field,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    /// 排版参数
    pub fn layout_options(&self) -> LayoutOptions {
        LayoutOptions {
            line_count: self.line_count,
            line_width: self.line_width,
            line_gap: self.line_gap,
        }
    }

    /// 对话框尺寸（给定字体行高）
    pub fn box_size(&self, line_height: u32) -> (u32, u32) {
        let lines = self.line_count as u32;
        let text_height = lines * line_height + lines.saturating_sub(1) * self.line_gap;
        (
            self.line_width + self.padding * 2,
            text_height + self.padding * 2,
        )
    }

    /// 背景色，无法解析时为黑色
    pub fn background_color(&self) -> Rgba<u8> {
        parse_color(&self.background).unwrap_or(Rgba([0, 0, 0, 255]))
    }

    /// 文字颜色，无法解析时为白色
    pub fn text_color(&self) -> Rgba<u8> {
        parse_color(&self.text_color).unwrap_or(Rgba([255, 255, 255, 255]))
    }
}
