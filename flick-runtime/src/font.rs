//! # Font 模块
//!
//! 位图字体索引：码位 → {字形图像, 步进宽度}。
//!
//! 字体在构造后不可变，字形图像以 `Rc` 共享给排版出的每个 [`Glyph`](crate::text::Glyph)。
//!
//! ## 图集格式
//!
//! ```text
//! ┌───┬───┬───┬───┐
//! │ ␠ │ ! │ " │ # │   每格 char_width × char_height，
//! ├───┼───┼───┼───┤   按行优先顺序对应 runs 中的码位
//! │ $ │ % │ … │   │
//! └───┴───┴───┴───┘
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use image::RgbaImage;

use crate::error::FontError;

/// 单个字符
#[derive(Debug, Clone)]
pub struct FontChar {
    /// 码位
    pub codepoint: char,
    /// 字形图像（alpha 通道为字形遮罩）
    pub image: Rc<RgbaImage>,
    /// 步进宽度（像素）
    pub advance: u32,
}

/// 位图字体
#[derive(Debug, Clone)]
pub struct Font {
    /// 字体名称
    pub name: String,
    /// 行高（像素）
    pub line_height: u32,
    characters: HashMap<char, FontChar>,
}

impl Font {
    /// 创建空字体
    pub fn new(name: impl Into<String>, line_height: u32) -> Self {
        Self {
            name: name.into(),
            line_height,
            characters: HashMap::new(),
        }
    }

    /// 从等宽图集构建字体
    ///
    /// # 参数
    ///
    /// - `atlas`: 字体图集
    /// - `char_width` / `char_height`: 字符格尺寸，同时作为步进宽度与行高
    /// - `runs`: 码位区间，如 `"32-126,160"`（闭区间，逗号分隔）
    pub fn from_atlas(
        name: impl Into<String>,
        atlas: &RgbaImage,
        char_width: u32,
        char_height: u32,
        runs: &str,
    ) -> Result<Self, FontError> {
        if char_width == 0 || char_height == 0 {
            return Err(FontError::InvalidCellSize {
                width: char_width,
                height: char_height,
            });
        }

        let codepoints = parse_runs(runs)?;
        let cols = atlas.width() / char_width;
        let rows = atlas.height() / char_height;
        let available = (cols * rows) as usize;
        if codepoints.len() > available {
            return Err(FontError::AtlasTooSmall {
                required: codepoints.len(),
                available,
            });
        }

        let mut font = Self::new(name, char_height);
        for (i, codepoint) in codepoints.into_iter().enumerate() {
            let ch = char::from_u32(codepoint).ok_or(FontError::InvalidCodepoint { codepoint })?;
            let col = i as u32 % cols;
            let row = i as u32 / cols;
            let cell = image::imageops::crop_imm(
                atlas,
                col * char_width,
                row * char_height,
                char_width,
                char_height,
            )
            .to_image();
            font.insert(ch, cell, char_width);
        }

        Ok(font)
    }

    /// 添加（或替换）一个字符
    pub fn insert(&mut self, codepoint: char, image: RgbaImage, advance: u32) {
        self.characters.insert(
            codepoint,
            FontChar {
                codepoint,
                image: Rc::new(image),
                advance,
            },
        );
    }

    /// 查找字符
    pub fn get(&self, ch: char) -> Option<&FontChar> {
        self.characters.get(&ch)
    }

    /// 是否包含字符
    pub fn contains(&self, ch: char) -> bool {
        self.characters.contains_key(&ch)
    }

    /// 字符步进宽度，字体中不存在的字符宽度为 0
    pub fn advance(&self, ch: char) -> u32 {
        self.get(ch).map_or(0, |c| c.advance)
    }

    /// 测量一段文本的总宽度
    pub fn measure(&self, text: &str) -> u32 {
        text.chars().map(|ch| self.advance(ch)).sum()
    }

    /// 字符数量
    pub fn len(&self) -> usize {
        self.characters.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }
}

/// 解析码位区间
///
/// `"65-67,97"` → `[65, 66, 67, 97]`
pub fn parse_runs(runs: &str) -> Result<Vec<u32>, FontError> {
    let mut codepoints = Vec::new();

    for run in runs.split(',').map(str::trim).filter(|r| !r.is_empty()) {
        let invalid = || FontError::InvalidRun {
            run: run.to_string(),
        };

        let (min, max) = match run.split_once('-') {
            Some((min, max)) => (min.trim(), max.trim()),
            None => (run, run),
        };
        let min: u32 = min.parse().map_err(|_| invalid())?;
        let max: u32 = max.parse().map_err(|_| invalid())?;
        if min > max {
            return Err(invalid());
        }

        codepoints.extend(min..=max);
    }

    Ok(codepoints)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::Rgba;

    /// 测试用等宽字体：每个可打印 ASCII 字符是 `width × height` 的实心方块，空格透明
    pub(crate) fn block_font(width: u32, height: u32) -> Font {
        let mut font = Font::new("block", height);
        for code in 32u8..=126 {
            let ch = code as char;
            let fill = if ch == ' ' {
                Rgba([0, 0, 0, 0])
            } else {
                Rgba([255, 255, 255, 255])
            };
            font.insert(ch, RgbaImage::from_pixel(width, height, fill), width);
        }
        font
    }

    #[test]
    fn test_parse_runs() {
        assert_eq!(parse_runs("65-67,97").unwrap(), vec![65, 66, 67, 97]);
        assert_eq!(parse_runs(" 32 - 33 , ").unwrap(), vec![32, 33]);
        assert!(parse_runs("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_runs_invalid() {
        assert!(matches!(
            parse_runs("a-b"),
            Err(FontError::InvalidRun { run }) if run == "a-b"
        ));
        assert!(matches!(parse_runs("9-3"), Err(FontError::InvalidRun { .. })));
    }

    #[test]
    fn test_from_atlas_slices_cells_row_major() {
        // 2 列 × 2 行图集，每格 3x4，第 i 格的红色通道写入 i
        let mut atlas = RgbaImage::new(6, 8);
        for (x, y, pixel) in atlas.enumerate_pixels_mut() {
            let index = (y / 4) * 2 + x / 3;
            *pixel = Rgba([index as u8, 0, 0, 255]);
        }

        let font = Font::from_atlas("test", &atlas, 3, 4, "65-68").unwrap();
        assert_eq!(font.len(), 4);
        assert_eq!(font.line_height, 4);
        assert_eq!(font.advance('A'), 3);

        let c = font.get('C').unwrap();
        assert_eq!(c.image.dimensions(), (3, 4));
        assert_eq!(c.image.get_pixel(0, 0)[0], 2);
        assert_eq!(font.get('D').unwrap().image.get_pixel(2, 3)[0], 3);
    }

    #[test]
    fn test_from_atlas_too_small() {
        let atlas = RgbaImage::new(6, 4);
        let result = Font::from_atlas("test", &atlas, 3, 4, "65-70");
        assert_eq!(
            result.unwrap_err(),
            FontError::AtlasTooSmall {
                required: 6,
                available: 2
            }
        );
    }

    #[test]
    fn test_from_atlas_zero_cell() {
        let atlas = RgbaImage::new(6, 4);
        assert!(matches!(
            Font::from_atlas("test", &atlas, 0, 4, "65"),
            Err(FontError::InvalidCellSize { .. })
        ));
    }

    #[test]
    fn test_measure_ignores_missing_chars() {
        let font = block_font(4, 6);
        assert_eq!(font.measure("ab c"), 16);
        assert_eq!(font.advance('é'), 0);
        assert_eq!(font.measure("aé"), 4);
    }
}
