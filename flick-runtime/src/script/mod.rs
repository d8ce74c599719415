//! # Script 模块
//!
//! 对象行为脚本：一个受限的指令调用语言，只能调用能力表中的指令。
//!
//! ## 模块结构
//!
//! - [`lexer`]：分词
//! - [`parser`]：递归下降解析
//! - [`ast`]：语法树、能力表、指令展开
//! - [`expr`]：表达式求值
//!
//! ## 示例
//!
//! ```text
//! SET('keys', GET('keys', 0) + 1)
//! if GET('keys') >= 3 {
//!     await SAY("the door {shk}rattles{-shk}")
//!     TRANSFER('hall')
//! } else {
//!     HIDE()
//! }
//! ```

pub mod ast;
pub mod expr;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Call, CommandName, Expr, Instr, Stmt};
pub use expr::{EvalContext, evaluate, evaluate_to_bool};

use crate::error::ScriptError;

/// 编译后的行为脚本
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BehaviorScript {
    instrs: Vec<Instr>,
}

impl BehaviorScript {
    /// 编译脚本文本
    pub fn compile(source: &str) -> Result<Self, ScriptError> {
        let tokens = lexer::lex(source)?;
        let stmts = parser::parse(tokens)?;
        Ok(Self {
            instrs: ast::flatten(stmts),
        })
    }

    /// 展开后的指令
    pub fn instructions(&self) -> &[Instr] {
        &self.instrs
    }

    /// 脚本中出现的全部语句级调用（不含表达式内的 `GET`）
    pub fn calls(&self) -> impl Iterator<Item = &Call> {
        self.instrs.iter().filter_map(|instr| match instr {
            Instr::Call { call, .. } => Some(call),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }
}
