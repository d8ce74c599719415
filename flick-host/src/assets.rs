//! # Assets 模块
//!
//! 读取项目文件与字体描述文件，解码其中的 PNG data URL。
//!
//! ## 字体描述文件
//!
//! ```json
//! {
//!   "name": "ascii-small",
//!   "char_width": 4,
//!   "char_height": 8,
//!   "runs": "32-126",
//!   "atlas": "data:image/png;base64,iVBORw0..."
//! }
//! ```

use std::fs;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use flick_runtime::{DrawingImages, Font, FontError, ProjectData};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// 资源加载错误
#[derive(Debug, Error)]
pub enum AssetError {
    /// 文件读取失败
    #[error("读取 '{path}' 失败: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 解析失败
    #[error("解析 '{path}' 失败: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// 不是 base64 data URL
    #[error("无效的 data URL: {0}")]
    InvalidDataUrl(String),

    /// base64 解码失败
    #[error("base64 解码失败: {0}")]
    Base64(#[from] base64::DecodeError),

    /// 图像解码失败
    #[error("图像解码失败: {0}")]
    Image(#[from] image::ImageError),

    /// 字体构建失败
    #[error("字体构建失败: {0}")]
    Font(#[from] FontError),
}

/// 字体描述
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(default)]
    pub name: String,
    pub char_width: u32,
    pub char_height: u32,
    /// 码位区间，如 `"32-126,160"`
    pub runs: String,
    /// 图集 PNG data URL
    pub atlas: String,
}

impl FontSpec {
    /// 解码图集并构建字体
    pub fn build(&self) -> Result<Font, AssetError> {
        let atlas = decode_data_url(&self.atlas)?;
        let font = Font::from_atlas(
            &self.name,
            &atlas,
            self.char_width,
            self.char_height,
            &self.runs,
        )?;
        debug!(name = %self.name, chars = font.len(), "字体构建完成");
        Ok(font)
    }
}

/// 已加载的项目
#[derive(Debug, Clone)]
pub struct LoadedProject {
    pub project: ProjectData,
    pub drawings: DrawingImages,
}

/// 解码 `data:image/png;base64,...` 形式的图像
pub fn decode_data_url(url: &str) -> Result<RgbaImage, AssetError> {
    let payload = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .filter(|(header, _)| header.ends_with(";base64"))
        .map(|(_, payload)| payload)
        .ok_or_else(|| AssetError::InvalidDataUrl(preview(url)))?;

    let bytes = STANDARD.decode(payload.trim())?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}

/// 解码项目中的全部绘图
///
/// 无法解码的绘图会被跳过并记录警告，引用它的对象不会被绘制。
pub fn decode_drawings(project: &ProjectData) -> DrawingImages {
    let mut drawings = DrawingImages::new();
    for drawing in &project.drawings {
        match decode_data_url(&drawing.data) {
            Ok(image) => {
                drawings.insert(drawing.id.clone(), image);
            }
            Err(e) => warn!(drawing = %drawing.id, error = %e, "绘图解码失败"),
        }
    }
    drawings
}

/// 加载项目文件并解码绘图
pub fn load_project(path: impl AsRef<Path>) -> Result<LoadedProject, AssetError> {
    let project: ProjectData = read_json(path.as_ref())?;
    let drawings = decode_drawings(&project);
    debug!(
        scenes = project.scenes.len(),
        drawings = drawings.len(),
        "项目加载完成"
    );
    Ok(LoadedProject { project, drawings })
}

/// 加载字体描述文件
pub fn load_font(path: impl AsRef<Path>) -> Result<Font, AssetError> {
    let spec: FontSpec = read_json(path.as_ref())?;
    spec.build()
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AssetError> {
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| AssetError::Json {
        path: display,
        source,
    })
}

/// 错误信息中只保留开头一段
fn preview(text: &str) -> String {
    let head: String = text.chars().take(32).collect();
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head
    }
}

/// 把图像编码为 PNG data URL
pub fn encode_data_url(image: &RgbaImage) -> Result<String, AssetError> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(image.clone())
        .write_to(&mut bytes, image::ImageOutputFormat::Png)?;
    Ok(format!(
        "data:image/png;base64,{}",
        STANDARD.encode(bytes.into_inner())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_data_url_roundtrip() {
        let image = RgbaImage::from_pixel(3, 2, Rgba([10, 20, 30, 255]));
        let url = encode_data_url(&image).unwrap();
        assert!(url.starts_with("data:image/png;base64,"));

        let decoded = decode_data_url(&url).unwrap();
        assert_eq!(decoded, image);
    }

    #[test]
    fn test_invalid_data_urls() {
        assert!(matches!(
            decode_data_url("image.png"),
            Err(AssetError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png,raw"),
            Err(AssetError::InvalidDataUrl(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,!!!"),
            Err(AssetError::Base64(_))
        ));
        assert!(matches!(
            decode_data_url("data:image/png;base64,aGVsbG8="),
            Err(AssetError::Image(_))
        ));
    }

    #[test]
    fn test_font_spec_build() {
        // 2 个字符格：'A' 实心，'B' 透明
        let mut atlas = RgbaImage::new(8, 4);
        for y in 0..4 {
            for x in 0..4 {
                atlas.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let spec = FontSpec {
            name: "tiny".to_string(),
            char_width: 4,
            char_height: 4,
            runs: "65-66".to_string(),
            atlas: encode_data_url(&atlas).unwrap(),
        };

        let font = spec.build().unwrap();
        assert_eq!(font.len(), 2);
        assert_eq!(font.line_height, 4);
        assert_eq!(font.get('A').unwrap().image.get_pixel(0, 0)[3], 255);
        assert_eq!(font.get('B').unwrap().image.get_pixel(0, 0)[3], 0);

        let too_many = FontSpec {
            runs: "65-70".to_string(),
            ..spec
        };
        assert!(matches!(
            too_many.build(),
            Err(AssetError::Font(FontError::AtlasTooSmall { .. }))
        ));
    }

    #[test]
    fn test_undecodable_drawings_are_skipped() {
        let json = r#"{
            "drawings": [
                { "id": "bad", "data": "not a url" }
            ],
            "scenes": [ { "id": "s1", "objects": [] } ]
        }"#;
        let project = ProjectData::from_json(json).unwrap();
        assert!(decode_drawings(&project).is_empty());
    }
}
