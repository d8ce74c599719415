//! # 排版模块
//!
//! 指令流 → 页面。
//!
//! ## 流程
//!
//! 1. [`widen_long_spans`]：总宽度超过行宽的不可断片段整体改为可断
//! 2. 从当前行首向前累加像素宽度，遇到强制断开或溢出时确定行尾
//! 3. 溢出时从溢出位置向回查找最近的可断字形，在它之前断行（空格被丢弃）
//! 4. 每行字形按行内偏移定位，并按值快照当前样式表
//!
//! 单个字形本身超过行宽时无法再拆分，该字形独占一行并允许溢出。

use tracing::warn;

use super::command::{BreakTarget, Command};
use super::page::{Glyph, Offset, Page, Point};
use super::style::{StyleMap, apply_style};
use crate::font::Font;

/// 默认行间距（像素）
pub const DEFAULT_LINE_GAP: u32 = 4;

/// 排版参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOptions {
    /// 每页行数
    pub line_count: usize,
    /// 每行像素宽度
    pub line_width: u32,
    /// 行间距（像素）
    pub line_gap: u32,
}

impl LayoutOptions {
    pub fn new(line_count: usize, line_width: u32) -> Self {
        Self {
            line_count,
            line_width,
            line_gap: DEFAULT_LINE_GAP,
        }
    }
}

/// 行尾类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineEnd {
    /// 强制断开，`at` 处的断开指令被消费
    Explicit { at: usize, target: BreakTarget },
    /// 自动换行，`consume` 为 true 时丢弃 `at` 处的空格
    Wrap { at: usize, consume: bool },
    /// 指令流结束
    End,
}

fn glyph_advance(command: &Command, font: &Font) -> u32 {
    match command {
        Command::Glyph { ch, .. } => font.advance(*ch),
        _ => 0,
    }
}

/// 将超过行宽的不可断片段中的所有字形标记为可断
pub fn widen_long_spans(commands: &mut [Command], font: &Font, line_width: u32) {
    for span in commands.split_mut(Command::can_break) {
        let width: u32 = span.iter().map(|c| glyph_advance(c, font)).sum();
        if width <= line_width {
            continue;
        }
        for command in span {
            if let Command::Glyph { breakable, .. } = command {
                *breakable = true;
            }
        }
    }
}

/// 从 `start` 开始查找下一个行尾
fn find_line_end(commands: &[Command], start: usize, font: &Font, line_width: u32) -> LineEnd {
    let mut width = 0u32;

    for (i, command) in commands.iter().enumerate().skip(start) {
        match command {
            Command::Break(target) => {
                return LineEnd::Explicit { at: i, target: *target };
            }
            Command::Style(_) => {}
            Command::Glyph { ch, .. } => {
                width += font.advance(*ch);
                if width > line_width {
                    return find_wrap_point(commands, start, i);
                }
            }
        }
    }

    LineEnd::End
}

/// 溢出时向回查找断点（包含溢出位置本身）
fn find_wrap_point(commands: &[Command], start: usize, overflow: usize) -> LineEnd {
    let has_glyph_before = |j: usize| {
        commands[start..j]
            .iter()
            .any(|c| matches!(c, Command::Glyph { .. }))
    };

    for j in (start..=overflow).rev() {
        if let Command::Glyph {
            ch,
            breakable: true,
        } = commands[j]
        {
            let is_space = ch == ' ';
            // 断点必须让行首前进，否则继续向回找
            if is_space || has_glyph_before(j) {
                return LineEnd::Wrap {
                    at: j,
                    consume: is_space,
                };
            }
        }
    }

    // 单个字形超过行宽：独占一行
    LineEnd::Wrap {
        at: overflow + 1,
        consume: false,
    }
}

struct PageBuilder<'a> {
    font: &'a Font,
    options: LayoutOptions,
    styles: StyleMap,
    pages: Vec<Page>,
    page: Page,
    line: usize,
}

impl<'a> PageBuilder<'a> {
    fn new(font: &'a Font, options: LayoutOptions) -> Self {
        Self {
            font,
            options: LayoutOptions {
                line_count: options.line_count.max(1),
                ..options
            },
            styles: StyleMap::new(),
            pages: Vec::new(),
            page: Page::default(),
            line: 0,
        }
    }

    fn push_line(&mut self, commands: &[Command]) {
        let y = self.line as u32 * (self.font.line_height + self.options.line_gap);
        let mut x = 0u32;

        for command in commands {
            match command {
                Command::Style(style) => apply_style(&mut self.styles, style),
                Command::Glyph { ch, .. } => {
                    let Some(font_char) = self.font.get(*ch) else {
                        warn!(ch = %ch, font = %self.font.name, "字体中缺少字符，已跳过");
                        continue;
                    };
                    self.page.glyphs.push(Glyph {
                        ch: *ch,
                        image: font_char.image.clone(),
                        position: Point {
                            x: x as i32,
                            y: y as i32,
                        },
                        offset: Offset::ZERO,
                        hidden: true,
                        fill: image::Rgba([255, 255, 255, 255]),
                        styles: self.styles.clone(),
                    });
                    x += font_char.advance;
                }
                Command::Break(_) => {}
            }
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.page));
        self.line = 0;
    }

    fn end_line(&mut self) {
        self.line += 1;
        if self.line == self.options.line_count {
            self.new_page();
        }
    }

    fn end_page(&mut self) {
        loop {
            self.end_line();
            if self.line % self.options.line_count == 0 {
                break;
            }
        }
    }

    fn do_break(&mut self, target: BreakTarget) {
        match target {
            BreakTarget::Line => self.end_line(),
            BreakTarget::Page => self.end_page(),
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.end_page();
        // 末尾 `{ep}` 产生的空页
        if self.pages.len() > 1 && self.pages.last().is_some_and(Page::is_empty) {
            self.pages.pop();
        }
        self.pages
    }
}

/// 指令流 → 页面
pub fn commands_to_pages(
    mut commands: Vec<Command>,
    font: &Font,
    options: &LayoutOptions,
) -> Vec<Page> {
    widen_long_spans(&mut commands, font, options.line_width);

    let mut builder = PageBuilder::new(font, *options);
    let mut start = 0;

    loop {
        match find_line_end(&commands, start, font, options.line_width) {
            LineEnd::Explicit { at, target } => {
                builder.push_line(&commands[start..at]);
                builder.do_break(target);
                start = at + 1;
            }
            LineEnd::Wrap { at, consume } => {
                builder.push_line(&commands[start..at]);
                builder.end_line();
                start = if consume { at + 1 } else { at };
            }
            LineEnd::End => {
                builder.push_line(&commands[start..]);
                break;
            }
        }
    }

    builder.finish()
}
