//! # 词法分析
//!
//! 行为脚本文本 → 带行号的 token 序列。
//!
//! 换行是语句分隔符，但在圆括号内被忽略，参数列表可以跨行书写。

use crate::error::ScriptError;

/// token 类型
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Str(String),
    Int(i64),
    Float(f64),
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    /// `;` 或换行
    Separator,
    Plus,
    Minus,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    /// `&&`
    AndAnd,
    /// `||`
    OrOr,
    /// `!`
    Bang,
}

/// 带行号的 token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    paren_depth: usize,
    tokens: Vec<Token>,
}

impl Lexer<'_> {
    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            line: self.line,
        });
    }

    /// 若下一个字符为 `next` 则消费并返回 `two`，否则返回 `one`
    fn pick(&mut self, next: char, two: TokenKind, one: TokenKind) -> TokenKind {
        if self.chars.peek() == Some(&next) {
            self.chars.next();
            two
        } else {
            one
        }
    }

    fn skip_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, ScriptError> {
        let line = self.line;
        let mut value = String::new();

        while let Some(c) = self.chars.next() {
            match c {
                c if c == quote => return Ok(TokenKind::Str(value)),
                '\\' => match self.chars.next() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(other) => value.push(other),
                    None => break,
                },
                '\n' => {
                    self.line += 1;
                    value.push('\n');
                }
                _ => value.push(c),
            }
        }

        Err(ScriptError::UnterminatedString { line })
    }

    fn number(&mut self, first: char) -> Result<TokenKind, ScriptError> {
        let mut text = first.to_string();
        let mut is_float = false;

        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !is_float {
                is_float = true;
                text.push(c);
            } else {
                break;
            }
            self.chars.next();
        }

        let invalid = || ScriptError::InvalidSyntax {
            line: self.line,
            message: format!("无法解析数字: '{text}'"),
        };
        if is_float {
            text.parse().map(TokenKind::Float).map_err(|_| invalid())
        } else {
            text.parse().map(TokenKind::Int).map_err(|_| invalid())
        }
    }

    fn ident(&mut self, first: char) -> TokenKind {
        let mut name = first.to_string();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        TokenKind::Ident(name)
    }
}

/// 分词
pub fn lex(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        line: 1,
        paren_depth: 0,
        tokens: Vec::new(),
    };

    while let Some(c) = lexer.chars.next() {
        let kind = match c {
            '\n' => {
                if lexer.paren_depth == 0 {
                    lexer.push(TokenKind::Separator);
                }
                lexer.line += 1;
                continue;
            }
            c if c.is_whitespace() => continue,
            '/' if lexer.chars.peek() == Some(&'/') => {
                lexer.skip_comment();
                continue;
            }
            ';' => TokenKind::Separator,
            '(' => {
                lexer.paren_depth += 1;
                TokenKind::LParen
            }
            ')' => {
                lexer.paren_depth = lexer.paren_depth.saturating_sub(1);
                TokenKind::RParen
            }
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '=' if lexer.chars.peek() == Some(&'=') => {
                lexer.chars.next();
                TokenKind::EqEq
            }
            '!' => lexer.pick('=', TokenKind::NotEq, TokenKind::Bang),
            '<' => lexer.pick('=', TokenKind::Le, TokenKind::Lt),
            '>' => lexer.pick('=', TokenKind::Ge, TokenKind::Gt),
            '&' if lexer.chars.peek() == Some(&'&') => {
                lexer.chars.next();
                TokenKind::AndAnd
            }
            '|' if lexer.chars.peek() == Some(&'|') => {
                lexer.chars.next();
                TokenKind::OrOr
            }
            '"' | '\'' => lexer.string(c)?,
            c if c.is_ascii_digit() => lexer.number(c)?,
            c if c.is_ascii_alphabetic() || c == '_' => lexer.ident(c),
            found => {
                return Err(ScriptError::UnexpectedChar {
                    line: lexer.line,
                    found,
                });
            }
        };
        lexer.push(kind);
    }

    Ok(lexer.tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_call_tokens() {
        assert_eq!(
            kinds(r#"SAY("hi"); DELAY(0.5)"#),
            vec![
                TokenKind::Ident("SAY".to_string()),
                TokenKind::LParen,
                TokenKind::Str("hi".to_string()),
                TokenKind::RParen,
                TokenKind::Separator,
                TokenKind::Ident("DELAY".to_string()),
                TokenKind::LParen,
                TokenKind::Float(0.5),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("== != < <= > >= && || ! + -"),
            vec![
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Plus,
                TokenKind::Minus,
            ]
        );
    }

    #[test]
    fn test_newlines_and_comments() {
        let tokens = lex("LOG(1) // note\nLOG(\n  2\n)").unwrap();
        let separators: Vec<usize> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Separator)
            .map(|t| t.line)
            .collect();
        // 括号内的换行不是分隔符
        assert_eq!(separators, vec![1]);
        assert_eq!(tokens.last().unwrap().line, 4);
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' "a\"b\n""#),
            vec![
                TokenKind::Str("it's".to_string()),
                TokenKind::Str("a\"b\n".to_string()),
            ]
        );
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            lex("LOG(\"oops)"),
            Err(ScriptError::UnterminatedString { line: 1 })
        );
        assert_eq!(
            lex("\nSET(a = 1)"),
            Err(ScriptError::UnexpectedChar { line: 2, found: '=' })
        );
        assert!(matches!(
            lex("LOG(#)"),
            Err(ScriptError::UnexpectedChar { found: '#', .. })
        ));
    }
}
