//! # 语法分析
//!
//! 递归下降解析器。
//!
//! ```text
//! script     := stmt*
//! stmt       := "if" expr block ("else" (block | if-stmt))?
//!             | "await"? call
//! block      := "{" stmt* "}"
//! expr       := or
//! or         := and (("or" | "||") and)*
//! and        := not (("and" | "&&") not)*
//! not        := ("not" | "!") not | comparison
//! comparison := additive (("==" | "!=" | "<" | "<=" | ">" | ">=") additive)?
//! additive   := unary (("+" | "-") unary)*
//! unary      := "-" unary | primary
//! primary    := literal | "OBJECT" | "SCENE" | "(" expr ")" | "GET" "(" args ")"
//! ```
//!
//! 语句之间的 `;` / 换行可以省略或重复。
//!
//! 嵌套层数（括号、一元运算、运算符链、`if`）超过 [`MAX_NESTING`] 时报错，
//! 解析、求值与展开的递归深度都以此为上限。

use super::ast::{BinaryOp, Call, CommandName, Expr, Stmt};
use super::lexer::{Token, TokenKind};
use crate::error::ScriptError;
use crate::state::VarValue;

/// 最大嵌套层数
pub const MAX_NESTING: usize = 64;

/// 解析 token 序列为语句列表
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Stmt>, ScriptError> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let stmts = parser.parse_block_body()?;
    if let Some(token) = parser.peek() {
        return Err(ScriptError::InvalidSyntax {
            line: token.line,
            message: "多余的 '}'".to_string(),
        });
    }
    Ok(stmts)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// 当前行号（输入结束时取最后一个 token 的行号）
    fn line(&self) -> usize {
        self.peek()
            .or_else(|| self.tokens.last())
            .map_or(1, |t| t.line)
    }

    fn error(&self, message: impl Into<String>) -> ScriptError {
        ScriptError::InvalidSyntax {
            line: self.line(),
            message: message.into(),
        }
    }

    /// 进入一层嵌套
    fn enter(&mut self) -> Result<(), ScriptError> {
        if self.depth >= MAX_NESTING {
            return Err(self.error("嵌套过深"));
        }
        self.depth += 1;
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn check_ident(&self, name: &str) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Ident(ident)) if ident == name)
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<(), ScriptError> {
        if self.check(&kind) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(format!("缺少 {what}")))
        }
    }

    fn skip_separators(&mut self) {
        while self.check(&TokenKind::Separator) {
            self.pos += 1;
        }
    }

    /// 解析语句直到输入结束或遇到 `}`（不消费）
    fn parse_block_body(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        let mut stmts = Vec::new();
        loop {
            self.skip_separators();
            match self.peek_kind() {
                None | Some(TokenKind::RBrace) => return Ok(stmts),
                _ => stmts.push(self.parse_stmt()?),
            }
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, ScriptError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let body = self.parse_block_body()?;
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(body)
    }

    fn parse_stmt(&mut self) -> Result<Stmt, ScriptError> {
        if self.check_ident("if") {
            return self.parse_if();
        }

        let awaited = self.check_ident("await");
        if awaited {
            self.pos += 1;
        }

        let call = self.parse_call()?;
        if awaited && !call.command.is_awaitable() {
            return Err(ScriptError::InvalidSyntax {
                line: call.line,
                message: format!("指令 '{}' 不可等待", call.command),
            });
        }
        Ok(Stmt::Call { call, awaited })
    }

    fn parse_if(&mut self) -> Result<Stmt, ScriptError> {
        let line = self.line();
        self.enter()?;
        self.pos += 1;
        let condition = self.parse_expr()?;
        let then_body = self.parse_block()?;

        // 允许 `}` 与 `else` 之间换行
        let before_else = self.pos;
        self.skip_separators();
        let else_body = if self.check_ident("else") {
            self.pos += 1;
            if self.check_ident("if") {
                vec![self.parse_if()?]
            } else {
                self.parse_block()?
            }
        } else {
            self.pos = before_else;
            Vec::new()
        };
        self.leave(1);

        Ok(Stmt::If {
            condition,
            then_body,
            else_body,
            line,
        })
    }

    /// `NAME(args)`
    fn parse_call(&mut self) -> Result<Call, ScriptError> {
        let line = self.line();
        let name = match self.advance() {
            Some(Token {
                kind: TokenKind::Ident(name),
                ..
            }) => name,
            _ => return Err(ScriptError::InvalidSyntax {
                line,
                message: "期望指令调用".to_string(),
            }),
        };

        let command = CommandName::from_name(&name).ok_or_else(|| ScriptError::UnknownCommand {
            line,
            command: name.clone(),
        })?;

        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.check(&TokenKind::Comma) {
                    self.pos += 1;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen, "')'")?;

        let (min, max) = command.arity();
        if args.len() < min || args.len() > max {
            let expected = if min == max {
                min.to_string()
            } else {
                format!("{min}-{max}")
            };
            return Err(ScriptError::ArgumentCount {
                line,
                command: name,
                expected,
                actual: args.len(),
            });
        }

        Ok(Call {
            command,
            args,
            line,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, ScriptError> {
        self.enter()?;
        let expr = self.parse_or()?;
        self.leave(1);
        Ok(expr)
    }

    // 运算符链每多一环，语法树就深一层
    fn parse_or(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.parse_and()?;
        let mut links = 0;
        while self.check_ident("or") || self.check(&TokenKind::OrOr) {
            self.enter()?;
            links += 1;
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.parse_not()?;
        let mut links = 0;
        while self.check_ident("and") || self.check(&TokenKind::AndAnd) {
            self.enter()?;
            links += 1;
            self.pos += 1;
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ScriptError> {
        if self.check_ident("not") || self.check(&TokenKind::Bang) {
            self.enter()?;
            self.pos += 1;
            let inner = self.parse_not()?;
            self.leave(1);
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ScriptError> {
        let left = self.parse_additive()?;
        let op = match self.peek_kind() {
            Some(TokenKind::EqEq) => BinaryOp::Eq,
            Some(TokenKind::NotEq) => BinaryOp::NotEq,
            Some(TokenKind::Lt) => BinaryOp::Lt,
            Some(TokenKind::Le) => BinaryOp::Le,
            Some(TokenKind::Gt) => BinaryOp::Gt,
            Some(TokenKind::Ge) => BinaryOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_additive()?;
        Ok(Expr::binary(op, left, right))
    }

    fn parse_additive(&mut self) -> Result<Expr, ScriptError> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.enter()?;
            links += 1;
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ScriptError> {
        if self.check(&TokenKind::Minus) {
            self.enter()?;
            self.pos += 1;
            let inner = self.parse_unary()?;
            self.leave(1);
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ScriptError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("表达式意外结束"));
        };

        match token.kind {
            TokenKind::Str(value) => {
                self.pos += 1;
                Ok(Expr::Literal(VarValue::String(value)))
            }
            TokenKind::Int(value) => {
                self.pos += 1;
                Ok(Expr::Literal(VarValue::Int(value)))
            }
            TokenKind::Float(value) => {
                self.pos += 1;
                Ok(Expr::Literal(VarValue::Float(value)))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "右括号 ')'")?;
                Ok(expr)
            }
            TokenKind::Ident(ident) => match ident.as_str() {
                "true" => {
                    self.pos += 1;
                    Ok(Expr::bool(true))
                }
                "false" => {
                    self.pos += 1;
                    Ok(Expr::bool(false))
                }
                "OBJECT" => {
                    self.pos += 1;
                    Ok(Expr::ObjectId)
                }
                "SCENE" => {
                    self.pos += 1;
                    Ok(Expr::SceneId)
                }
                _ => self.parse_expr_call(),
            },
            other => Err(self.error(format!("无法解析表达式，意外的 {other:?}"))),
        }
    }

    /// 表达式中的调用，只允许无副作用的指令
    fn parse_expr_call(&mut self) -> Result<Expr, ScriptError> {
        let mut call = self.parse_call()?;
        if !call.command.is_pure() {
            return Err(ScriptError::InvalidSyntax {
                line: call.line,
                message: format!("指令 '{}' 不能用在表达式中", call.command),
            });
        }

        let default = (call.args.len() > 1).then(|| Box::new(call.args.remove(1)));
        let name = Box::new(call.args.remove(0));
        Ok(Expr::Get { name, default })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::lex;

    fn parse_str(source: &str) -> Result<Vec<Stmt>, ScriptError> {
        parse(lex(source)?)
    }

    fn single_call(source: &str) -> (Call, bool) {
        let mut stmts = parse_str(source).unwrap();
        assert_eq!(stmts.len(), 1);
        match stmts.remove(0) {
            Stmt::Call { call, awaited } => (call, awaited),
            other => panic!("期望调用，实际 {other:?}"),
        }
    }

    #[test]
    fn test_statements_with_separators() {
        let stmts = parse_str("SHOW()\n\nHIDE('door'); ;LOG(\"x\") RESET_GAME()").unwrap();
        assert_eq!(stmts.len(), 4);
        assert!(parse_str("").unwrap().is_empty());
        assert!(parse_str("// 只有注释\n").unwrap().is_empty());
    }

    #[test]
    fn test_await_call() {
        let (call, awaited) = single_call("await SAY('hello')");
        assert!(awaited);
        assert_eq!(call.command, CommandName::Say);
        assert_eq!(call.args, vec![Expr::string("hello")]);
    }

    #[test]
    fn test_await_requires_awaitable() {
        assert!(matches!(
            parse_str("await LOG('x')"),
            Err(ScriptError::InvalidSyntax { line: 1, .. })
        ));
    }

    #[test]
    fn test_precedence() {
        let (call, _) = single_call("LOG(1 + 2 == 3 and not false or GET('a') < -1)");
        let expected = Expr::Or(
            Box::new(Expr::And(
                Box::new(Expr::binary(
                    BinaryOp::Eq,
                    Expr::binary(BinaryOp::Add, Expr::int(1), Expr::int(2)),
                    Expr::int(3),
                )),
                Box::new(Expr::Not(Box::new(Expr::bool(false)))),
            )),
            Box::new(Expr::binary(
                BinaryOp::Lt,
                Expr::Get {
                    name: Box::new(Expr::string("a")),
                    default: None,
                },
                Expr::Neg(Box::new(Expr::int(1))),
            )),
        );
        assert_eq!(call.args, vec![expected]);
    }

    #[test]
    fn test_symbolic_logic_aliases() {
        let (word, _) = single_call("LOG(true and false or not true)");
        let (symbol, _) = single_call("LOG(true && false || !true)");
        assert_eq!(word.args, symbol.args);
    }

    #[test]
    fn test_if_else_chain() {
        let stmts = parse_str(
            "if GET('n', 0) > 1 {\n  SHOW()\n}\nelse if OBJECT == 'x' { HIDE() } else { LOG('z') }",
        )
        .unwrap();
        assert_eq!(stmts.len(), 1);

        let Stmt::If {
            then_body,
            else_body,
            line,
            ..
        } = &stmts[0]
        else {
            panic!("期望 if 语句");
        };
        assert_eq!(*line, 1);
        assert_eq!(then_body.len(), 1);
        assert!(matches!(&else_body[..], [Stmt::If { else_body, .. }] if else_body.len() == 1));
    }

    #[test]
    fn test_if_without_else_keeps_following_statement() {
        let stmts = parse_str("if true { SHOW() }\nHIDE()").unwrap();
        assert_eq!(stmts.len(), 2);
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_str("LOG('a')\nEXPLODE()"),
            Err(ScriptError::UnknownCommand {
                line: 2,
                command: "EXPLODE".to_string()
            })
        );
    }

    #[test]
    fn test_argument_count() {
        assert_eq!(
            parse_str("SET('a')"),
            Err(ScriptError::ArgumentCount {
                line: 1,
                command: "SET".to_string(),
                expected: "2".to_string(),
                actual: 1,
            })
        );
        assert!(matches!(
            parse_str("SHOW('a', 'b')"),
            Err(ScriptError::ArgumentCount { expected, .. }) if expected == "0-1"
        ));
    }

    #[test]
    fn test_side_effect_call_in_expression_rejected() {
        assert!(matches!(
            parse_str("LOG(SAY('x'))"),
            Err(ScriptError::InvalidSyntax { .. })
        ));
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse_str("LOG('a'"),
            Err(ScriptError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            parse_str("if true SHOW()"),
            Err(ScriptError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            parse_str("SHOW() }"),
            Err(ScriptError::InvalidSyntax { .. })
        ));
        assert!(matches!(
            parse_str("'just a string'"),
            Err(ScriptError::InvalidSyntax { .. })
        ));
    }

    fn is_too_deep(result: Result<Vec<Stmt>, ScriptError>) -> bool {
        matches!(result, Err(ScriptError::InvalidSyntax { message, .. }) if message == "嵌套过深")
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let deep = 20_000;
        assert!(is_too_deep(parse_str(&format!("LOG({}1)", "-".repeat(deep)))));
        assert!(is_too_deep(parse_str(&format!("LOG({}true)", "!".repeat(deep)))));
        assert!(is_too_deep(parse_str(&format!(
            "LOG({}1{})",
            "(".repeat(deep),
            ")".repeat(deep)
        ))));
        assert!(is_too_deep(parse_str(&format!(
            "LOG(1{})",
            " + 1".repeat(deep)
        ))));
        assert!(is_too_deep(parse_str(&format!(
            "{}SHOW(){}",
            "if true { ".repeat(deep),
            " }".repeat(deep)
        ))));
        assert!(is_too_deep(parse_str(&format!(
            "if false {{ SHOW() }}{}",
            " else if false { SHOW() }".repeat(deep)
        ))));
    }

    #[test]
    fn test_nesting_budget_is_per_expression() {
        // 每条语句单独计数，前一条语句的嵌套不会累积
        let line = format!("LOG({}1{})", "(".repeat(40), ")".repeat(40));
        let source = format!("{line}\n{line}\n{line}");
        assert_eq!(parse_str(&source).unwrap().len(), 3);

        let (call, _) = single_call("LOG(-(-(1)) + 2 - 3)");
        assert_eq!(call.args.len(), 1);
    }
}
