//! # 页面数据
//!
//! 排版产物：带位置与样式快照的字形序列。
//! 页面结构在排版完成后不再变化，播放期间只修改 `hidden` / `offset` / `fill`。

use std::rc::Rc;

use image::{Rgba, RgbaImage};

use super::style::StyleMap;

/// 行内像素坐标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// 动画偏移
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };
}

/// 字形（渲染记录）
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// 对应字符
    pub ch: char,
    /// 字形图像，与字体共享
    pub image: Rc<RgbaImage>,
    /// 页内位置
    pub position: Point,
    /// 动画偏移
    pub offset: Offset,
    /// 是否隐藏（尚未显示）
    pub hidden: bool,
    /// 填充颜色
    pub fill: Rgba<u8>,
    /// 排版时的样式快照
    pub styles: StyleMap,
}

/// 页面
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub glyphs: Vec<Glyph>,
}

impl Page {
    /// 字形数量
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// 页面的全部字符
    pub fn text(&self) -> String {
        self.glyphs.iter().map(|g| g.ch).collect()
    }

    /// 当前可见的字符
    pub fn visible_text(&self) -> String {
        self.glyphs
            .iter()
            .filter(|g| !g.hidden)
            .map(|g| g.ch)
            .collect()
    }

    /// 页面占用的行数（按不同的 y 坐标计）
    pub fn line_count(&self) -> usize {
        let mut ys: Vec<i32> = self.glyphs.iter().map(|g| g.position.y).collect();
        ys.dedup();
        ys.len()
    }
}
