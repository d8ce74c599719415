//! # Config 模块
//!
//! 宿主配置管理，集中管理所有配置项。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件 (flick.json)
//! 3. 默认值（最低）

use std::fs;
use std::path::{Path, PathBuf};

use flick_runtime::{ConfigError as PlayerConfigError, PlayerConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 项目文件（flicksy 导出的 JSON）
    #[serde(default = "default_project_path")]
    pub project_path: PathBuf,

    /// 字体描述文件（JSON，内含图集 data URL）
    #[serde(default = "default_font_path")]
    pub font_path: PathBuf,

    /// 帧导出目录
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// 每帧时长（秒）
    #[serde(default = "default_frame_dt")]
    pub frame_dt: f64,

    /// 单次点击后最多推进的帧数
    #[serde(default = "default_max_frames")]
    pub max_frames: u32,

    /// 日志级别（trace / debug / info / warn / error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 播放器配置
    #[serde(default)]
    pub player: PlayerConfig,
}

fn default_project_path() -> PathBuf {
    PathBuf::from("project.flicksy.json")
}

fn default_font_path() -> PathBuf {
    PathBuf::from("font.json")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("frames")
}

fn default_frame_dt() -> f64 {
    1.0 / 30.0
}

fn default_max_frames() -> u32 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            project_path: default_project_path(),
            font_path: default_font_path(),
            output_dir: default_output_dir(),
            frame_dt: default_frame_dt(),
            max_frames: default_max_frames(),
            log_level: default_log_level(),
            player: PlayerConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 如果文件不存在或解析失败，返回默认配置并记录警告。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    info!(path = %path.display(), "配置文件加载成功");
                    config
                }
                Err(e) => {
                    warn!(error = %e, "配置文件解析失败，使用默认配置");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(error = %e, "配置文件读取失败，使用默认配置");
                Self::default()
            }
        }
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationFailed(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.project_path.exists() {
            return Err(ConfigError::ValidationFailed(format!(
                "项目文件不存在: {}",
                self.project_path.display()
            )));
        }

        if !self.font_path.exists() {
            return Err(ConfigError::ValidationFailed(format!(
                "字体文件不存在: {}",
                self.font_path.display()
            )));
        }

        if !self.frame_dt.is_finite() || self.frame_dt <= 0.0 {
            return Err(ConfigError::ValidationFailed(format!(
                "frame_dt 必须为正数: {}",
                self.frame_dt
            )));
        }

        if self.max_frames == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_frames 必须大于 0".to_string(),
            ));
        }

        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::ValidationFailed(format!(
                "无法识别的日志级别: {}",
                self.log_level
            )));
        }

        self.player.validate()?;
        Ok(())
    }
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    SerializationFailed(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    IoError(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    ValidationFailed(String),
    /// 播放器配置无效
    #[error("配置验证失败: {0}")]
    Player(#[from] PlayerConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.max_frames, 600);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.player.scene_width, 160);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let json = r#"{ "frame_dt": 0.1, "player": { "dialogue": { "line_count": 3 } } }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.frame_dt, 0.1);
        assert_eq!(config.player.dialogue.line_count, 3);
        assert_eq!(config.player.dialogue.line_width, 144);
        assert_eq!(config.project_path, PathBuf::from("project.flicksy.json"));
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flick.json");

        let config = AppConfig {
            max_frames: 42,
            frame_dt: 0.05,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        assert_eq!(AppConfig::load(&path), config);
        assert_eq!(AppConfig::load(dir.path().join("missing.json")), AppConfig::default());
    }

    #[test]
    fn test_config_validation() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path().join("p.json");
        let font = dir.path().join("f.json");
        fs::write(&project, "{}").unwrap();
        fs::write(&font, "{}").unwrap();

        let mut config = AppConfig {
            project_path: project,
            font_path: font,
            ..AppConfig::default()
        };
        assert!(config.validate().is_ok());

        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());
        config.log_level = "debug".to_string();

        config.frame_dt = 0.0;
        assert!(config.validate().is_err());
        config.frame_dt = 0.05;

        config.player.dialogue.line_width = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::Player(PlayerConfigError::ZeroDialogueSize {
                field: "line_width"
            }))
        );

        config.project_path = dir.path().join("nope.json");
        assert!(config.validate().is_err());
    }
}
