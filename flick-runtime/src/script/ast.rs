//! # AST 模块
//!
//! 行为脚本的语法树与能力表定义。
//!
//! 语句只有两种：能力调用与 `if` 分支。编译时 `if` 被展开为跳转指令，
//! 解释器只需要一个程序计数器即可在任意 `await` 处挂起和恢复。

use std::fmt;

use crate::state::VarValue;

/// 能力表中的指令
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    /// `SET(name, value)`
    Set,
    /// `GET(name[, default])`
    Get,
    /// `LOG(text)`
    Log,
    /// `RESKIN(drawing[, object])`
    Reskin,
    /// `SHOW([object])`
    Show,
    /// `HIDE([object])`
    Hide,
    /// `TRANSFER(scene)`
    Transfer,
    /// `SAY(text)`，可等待
    Say,
    /// `DELAY(seconds)`，可等待
    Delay,
    /// `DIALOGUE()`，可等待对话空闲
    Dialogue,
    /// `RESET_OBJECT([object])`
    ResetObject,
    /// `RESET_SCENE([scene])`
    ResetScene,
    /// `RESET_GAME()`
    ResetGame,
}

impl CommandName {
    /// 全部指令
    pub const ALL: [CommandName; 13] = [
        Self::Set,
        Self::Get,
        Self::Log,
        Self::Reskin,
        Self::Show,
        Self::Hide,
        Self::Transfer,
        Self::Say,
        Self::Delay,
        Self::Dialogue,
        Self::ResetObject,
        Self::ResetScene,
        Self::ResetGame,
    ];

    /// 按脚本中的名称查找
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }

    /// 脚本中的名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Set => "SET",
            Self::Get => "GET",
            Self::Log => "LOG",
            Self::Reskin => "RESKIN",
            Self::Show => "SHOW",
            Self::Hide => "HIDE",
            Self::Transfer => "TRANSFER",
            Self::Say => "SAY",
            Self::Delay => "DELAY",
            Self::Dialogue => "DIALOGUE",
            Self::ResetObject => "RESET_OBJECT",
            Self::ResetScene => "RESET_SCENE",
            Self::ResetGame => "RESET_GAME",
        }
    }

    /// 参数数量范围（闭区间）
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::Set => (2, 2),
            Self::Get | Self::Reskin => (1, 2),
            Self::Log | Self::Transfer | Self::Say | Self::Delay => (1, 1),
            Self::Show | Self::Hide | Self::ResetObject | Self::ResetScene => (0, 1),
            Self::Dialogue | Self::ResetGame => (0, 0),
        }
    }

    /// 是否返回可等待的完成信号
    pub fn is_awaitable(&self) -> bool {
        matches!(self, Self::Say | Self::Delay | Self::Dialogue)
    }

    /// 是否可以出现在表达式中（无副作用）
    pub fn is_pure(&self) -> bool {
        matches!(self, Self::Get)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 二元运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// 表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 字面量
    Literal(VarValue),
    /// 当前对象 id（`OBJECT`）
    ObjectId,
    /// 当前场景 id（`SCENE`）
    SceneId,
    /// 读取变量（`GET(name[, default])`）
    Get {
        name: Box<Expr>,
        default: Option<Box<Expr>>,
    },
    /// 二元运算
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// 取负
    Neg(Box<Expr>),
    /// 逻辑与（短路）
    And(Box<Expr>, Box<Expr>),
    /// 逻辑或（短路）
    Or(Box<Expr>, Box<Expr>),
    /// 逻辑非
    Not(Box<Expr>),
}

impl Expr {
    /// 创建字符串字面量
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(VarValue::String(s.into()))
    }

    /// 创建布尔字面量
    pub fn bool(b: bool) -> Self {
        Self::Literal(VarValue::Bool(b))
    }

    /// 创建整数字面量
    pub fn int(n: i64) -> Self {
        Self::Literal(VarValue::Int(n))
    }

    /// 创建二元运算
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 字符串字面量的内容
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            Self::Literal(VarValue::String(s)) => Some(s),
            _ => None,
        }
    }
}

/// 能力调用
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub command: CommandName,
    pub args: Vec<Expr>,
    /// 所在行号（从 1 开始）
    pub line: usize,
}

/// 语句
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// 能力调用，`awaited` 为 true 时等待其完成信号
    Call { call: Call, awaited: bool },
    /// 条件分支
    If {
        condition: Expr,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
        line: usize,
    },
}

/// 展开后的指令
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// 执行能力调用
    Call { call: Call, awaited: bool },
    /// 条件为假时跳转
    JumpUnless {
        condition: Expr,
        target: usize,
        line: usize,
    },
    /// 无条件跳转
    Jump { target: usize },
}

/// 将语句树展开为线性指令
pub fn flatten(stmts: Vec<Stmt>) -> Vec<Instr> {
    let mut instrs = Vec::new();
    flatten_into(stmts, &mut instrs);
    instrs
}

fn flatten_into(stmts: Vec<Stmt>, instrs: &mut Vec<Instr>) {
    for stmt in stmts {
        match stmt {
            Stmt::Call { call, awaited } => instrs.push(Instr::Call { call, awaited }),
            Stmt::If {
                condition,
                then_body,
                else_body,
                line,
            } => {
                let branch = instrs.len();
                instrs.push(Instr::JumpUnless {
                    condition,
                    target: 0,
                    line,
                });
                flatten_into(then_body, instrs);

                if else_body.is_empty() {
                    let end = instrs.len();
                    patch_target(instrs, branch, end);
                } else {
                    let skip_else = instrs.len();
                    instrs.push(Instr::Jump { target: 0 });
                    let else_start = instrs.len();
                    patch_target(instrs, branch, else_start);
                    flatten_into(else_body, instrs);
                    let end = instrs.len();
                    patch_target(instrs, skip_else, end);
                }
            }
        }
    }
}

fn patch_target(instrs: &mut [Instr], at: usize, to: usize) {
    match &mut instrs[at] {
        Instr::JumpUnless { target, .. } | Instr::Jump { target } => *target = to,
        Instr::Call { .. } => {}
    }
}
