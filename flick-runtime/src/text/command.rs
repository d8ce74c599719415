//! # 排版指令
//!
//! token → 扁平的 {Glyph, Style, Break} 指令流，一一对应、保持顺序。

use super::token::{LINE_BREAK_MARKUP, PAGE_BREAK_MARKUP, Token};

/// 强制断开的目标
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakTarget {
    /// 换行
    Line,
    /// 分页
    Page,
}

/// 排版指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 单个字符
    ///
    /// `breakable` 表示允许在此处自动换行（空格，或被拓宽的超长片段）
    Glyph { ch: char, breakable: bool },
    /// 样式指令，原样保存花括号内的内容
    Style(String),
    /// 强制换行 / 分页
    Break(BreakTarget),
}

impl Command {
    /// 创建字符指令
    pub fn glyph(ch: char) -> Self {
        Self::Glyph {
            ch,
            breakable: ch == ' ',
        }
    }

    /// 是否是允许断开的位置
    pub fn can_break(&self) -> bool {
        matches!(
            self,
            Self::Break(_) | Self::Glyph {
                breakable: true,
                ..
            }
        )
    }
}

/// 单个标记 → 指令
fn markup_to_command(markup: &str) -> Command {
    match markup {
        PAGE_BREAK_MARKUP => Command::Break(BreakTarget::Page),
        LINE_BREAK_MARKUP => Command::Break(BreakTarget::Line),
        style => Command::Style(style.to_string()),
    }
}

/// token 序列 → 指令序列
pub fn tokens_to_commands(tokens: &[Token]) -> Vec<Command> {
    let mut commands = Vec::new();
    for token in tokens {
        match token {
            Token::Text(text) => commands.extend(text.chars().map(Command::glyph)),
            Token::Markup(markup) => commands.push(markup_to_command(markup)),
        }
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::token::tokenize;

    #[test]
    fn test_text_becomes_glyphs() {
        let commands = tokens_to_commands(&tokenize("Hello world"));
        assert_eq!(commands.len(), 11);
        assert!(commands.iter().all(|c| matches!(c, Command::Glyph { .. })));

        // 只有空格可断开
        let breakable: Vec<bool> = commands.iter().map(Command::can_break).collect();
        assert_eq!(breakable.iter().filter(|b| **b).count(), 1);
        assert!(breakable[5]);
    }

    #[test]
    fn test_markup_mapping() {
        let commands = tokens_to_commands(&tokenize("a{ep}b{el}c{wvy}\nd"));
        assert_eq!(
            commands,
            vec![
                Command::glyph('a'),
                Command::Break(BreakTarget::Page),
                Command::glyph('b'),
                Command::Break(BreakTarget::Line),
                Command::glyph('c'),
                Command::Style("wvy".to_string()),
                Command::Break(BreakTarget::Line),
                Command::glyph('d'),
            ]
        );
    }

    #[test]
    fn test_style_is_not_breakable() {
        assert!(!Command::Style("r".to_string()).can_break());
        assert!(Command::Break(BreakTarget::Line).can_break());
    }
}
