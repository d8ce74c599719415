//! # 标记分词
//!
//! 按花括号深度把对话脚本切分为文本 / 标记两类 token。
//!
//! ```text
//! "Hi {clr=red}you\n" → [Text("Hi "), Markup("clr=red"), Text("you"), Markup("el")]
//! ```
//!
//! 分词永不报错：未闭合的花括号会把剩余内容作为标记输出。

/// 分词结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// 可见文本
    Text(String),
    /// 花括号内的标记
    Markup(String),
}

/// 换行对应的标记
pub const LINE_BREAK_MARKUP: &str = "el";
/// 分页对应的标记
pub const PAGE_BREAK_MARKUP: &str = "ep";

struct Tokenizer {
    tokens: Vec<Token>,
    buffer: String,
    depth: usize,
}

impl Tokenizer {
    fn open_brace(&mut self) {
        if self.depth == 0 {
            self.flush();
        }
        self.depth += 1;
    }

    fn close_brace(&mut self) {
        // 深度为 0 时多余的 `}` 直接丢弃
        if self.depth == 0 {
            return;
        }
        if self.depth == 1 {
            self.flush();
        }
        self.depth -= 1;
    }

    fn new_line(&mut self) {
        self.flush();
        self.tokens.push(Token::Markup(LINE_BREAK_MARKUP.to_string()));
    }

    fn flush(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.buffer);
        self.tokens.push(if self.depth > 0 {
            Token::Markup(content)
        } else {
            Token::Text(content)
        });
    }
}

/// 对脚本文本分词
pub fn tokenize(script: &str) -> Vec<Token> {
    let mut tokenizer = Tokenizer {
        tokens: Vec::new(),
        buffer: String::new(),
        depth: 0,
    };

    for ch in script.chars() {
        match ch {
            '{' => tokenizer.open_brace(),
            '}' => tokenizer.close_brace(),
            '\n' => tokenizer.new_line(),
            '\r' => {}
            _ => tokenizer.buffer.push(ch),
        }
    }

    tokenizer.flush();
    tokenizer.tokens
}
