//! # Text 模块
//!
//! 对话脚本的排版引擎。
//!
//! ```text
//! 脚本文本 ─tokenize→ Token ─tokens_to_commands→ Command ─commands_to_pages→ Page
//! ```
//!
//! 播放期间每帧由 [`animate_glyph`] 重新计算字形的瞬时样式，
//! 再由 [`draw_page`] 光栅化。

mod command;
mod layout;
mod page;
mod render;
mod style;
mod token;

pub use command::{BreakTarget, Command, tokens_to_commands};
pub use layout::{DEFAULT_LINE_GAP, LayoutOptions, commands_to_pages, widen_long_spans};
pub use page::{Glyph, Offset, Page, Point};
pub use render::{draw_page, render_page};
pub use style::{StyleMap, StyleValue, animate_glyph, apply_style, parse_color};
pub use token::{LINE_BREAK_MARKUP, PAGE_BREAK_MARKUP, Token, tokenize};

use crate::font::Font;

/// 脚本文本 → 页面
pub fn script_to_pages(script: &str, font: &Font, options: &LayoutOptions) -> Vec<Page> {
    let tokens = tokenize(script);
    let commands = tokens_to_commands(&tokens);
    commands_to_pages(commands, font, options)
}
