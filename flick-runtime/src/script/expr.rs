//! # 表达式求值
//!
//! ## 设计原则
//!
//! - 表达式无副作用，只读取变量与当前对象 / 场景 id
//! - 逻辑运算要求严格的布尔值，不做隐式转换
//!
//! ## 运算规则
//!
//! | 运算 | 操作数 | 结果 |
//! |------|--------|------|
//! | `+` | 数字 + 数字 | 数字（任一为浮点则为浮点） |
//! | `+` | 任一为字符串 | 字符串拼接 |
//! | `-` | 数字 | 数字 |
//! | `==` `!=` | 任意 | 布尔（整数与浮点按数值比较，其余不同类型不相等） |
//! | `<` `<=` `>` `>=` | 两个数字或两个字符串 | 布尔 |

use std::cmp::Ordering;

use super::ast::{BinaryOp, Expr};
use crate::error::RuntimeError;
use crate::state::VarValue;

/// 表达式求值上下文
pub trait EvalContext {
    /// 获取变量值
    fn get_var(&self, name: &str) -> Option<&VarValue>;

    /// 当前对象 id
    fn object_id(&self) -> &str;

    /// 当前场景 id
    fn scene_id(&self) -> &str;
}

/// 对表达式求值
pub fn evaluate(expr: &Expr, ctx: &impl EvalContext) -> Result<VarValue, RuntimeError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::ObjectId => Ok(VarValue::String(ctx.object_id().to_string())),
        Expr::SceneId => Ok(VarValue::String(ctx.scene_id().to_string())),

        Expr::Get { name, default } => {
            let name = evaluate(name, ctx)?;
            let name = expect_str(&name, "GET 变量名")?;
            match (ctx.get_var(name), default) {
                (Some(value), _) => Ok(value.clone()),
                (None, Some(default)) => evaluate(default, ctx),
                (None, None) => Err(RuntimeError::UndefinedVariable {
                    name: name.to_string(),
                }),
            }
        }

        Expr::Binary { op, left, right } => {
            let left = evaluate(left, ctx)?;
            let right = evaluate(right, ctx)?;
            binary(*op, &left, &right)
        }

        Expr::Neg(inner) => match evaluate(inner, ctx)? {
            VarValue::Int(n) => Ok(VarValue::Int(n.wrapping_neg())),
            VarValue::Float(f) => Ok(VarValue::Float(-f)),
            other => Err(mismatch("number", &other, "取负操作数")),
        },

        Expr::And(left, right) => {
            // 短路求值
            if !to_bool(&evaluate(left, ctx)?, "and 左操作数")? {
                return Ok(VarValue::Bool(false));
            }
            let right = to_bool(&evaluate(right, ctx)?, "and 右操作数")?;
            Ok(VarValue::Bool(right))
        }

        Expr::Or(left, right) => {
            if to_bool(&evaluate(left, ctx)?, "or 左操作数")? {
                return Ok(VarValue::Bool(true));
            }
            let right = to_bool(&evaluate(right, ctx)?, "or 右操作数")?;
            Ok(VarValue::Bool(right))
        }

        Expr::Not(inner) => {
            let value = to_bool(&evaluate(inner, ctx)?, "not 操作数")?;
            Ok(VarValue::Bool(!value))
        }
    }
}

/// 将表达式求值为布尔值（用于条件分支）
pub fn evaluate_to_bool(expr: &Expr, ctx: &impl EvalContext) -> Result<bool, RuntimeError> {
    let value = evaluate(expr, ctx)?;
    to_bool(&value, "条件表达式")
}

fn binary(op: BinaryOp, left: &VarValue, right: &VarValue) -> Result<VarValue, RuntimeError> {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => match (left, right) {
            (VarValue::Int(a), VarValue::Int(b)) => Ok(VarValue::Int(a.wrapping_sub(*b))),
            _ => {
                let a = expect_number(left, "- 左操作数")?;
                let b = expect_number(right, "- 右操作数")?;
                Ok(VarValue::Float(a - b))
            }
        },
        BinaryOp::Eq => Ok(VarValue::Bool(values_equal(left, right))),
        BinaryOp::NotEq => Ok(VarValue::Bool(!values_equal(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(left, right, op)?;
            let result = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(VarValue::Bool(result))
        }
    }
}

fn add(left: &VarValue, right: &VarValue) -> Result<VarValue, RuntimeError> {
    match (left, right) {
        (VarValue::Int(a), VarValue::Int(b)) => Ok(VarValue::Int(a.wrapping_add(*b))),
        (VarValue::String(_), _) | (_, VarValue::String(_)) => {
            Ok(VarValue::String(format!("{left}{right}")))
        }
        _ => {
            let a = expect_number(left, "+ 左操作数")?;
            let b = expect_number(right, "+ 右操作数")?;
            Ok(VarValue::Float(a + b))
        }
    }
}

fn compare(left: &VarValue, right: &VarValue, op: BinaryOp) -> Result<Ordering, RuntimeError> {
    let context = format!("{} 比较", op.symbol());
    match (left, right) {
        (VarValue::String(a), VarValue::String(b)) => Ok(a.cmp(b)),
        _ => {
            let a = expect_number(left, &context)?;
            let b = expect_number(right, &context)?;
            a.partial_cmp(&b).ok_or_else(|| RuntimeError::TypeMismatch {
                expected: "comparable number",
                actual: "NaN".to_string(),
                context,
            })
        }
    }
}

/// 判断两个值是否相等
///
/// 整数与浮点按数值比较，其余不同类型永远不相等
fn values_equal(left: &VarValue, right: &VarValue) -> bool {
    match (left, right) {
        (VarValue::String(a), VarValue::String(b)) => a == b,
        (VarValue::Bool(a), VarValue::Bool(b)) => a == b,
        (VarValue::Int(a), VarValue::Int(b)) => a == b,
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => (a - b).abs() < f64::EPSILON,
            _ => false,
        },
    }
}

fn mismatch(expected: &'static str, actual: &VarValue, context: &str) -> RuntimeError {
    RuntimeError::TypeMismatch {
        expected,
        actual: actual.type_name().to_string(),
        context: context.to_string(),
    }
}

fn to_bool(value: &VarValue, context: &str) -> Result<bool, RuntimeError> {
    match value {
        VarValue::Bool(b) => Ok(*b),
        other => Err(mismatch("bool", other, context)),
    }
}

fn expect_number(value: &VarValue, context: &str) -> Result<f64, RuntimeError> {
    value.as_f64().ok_or_else(|| mismatch("number", value, context))
}

/// 要求字符串值
pub fn expect_str<'a>(value: &'a VarValue, context: &str) -> Result<&'a str, RuntimeError> {
    value.as_str().ok_or_else(|| mismatch("string", value, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::lexer::lex;
    use crate::script::parser::parse;
    use crate::script::ast::Stmt;
    use std::collections::HashMap;

    /// 测试用的简单上下文
    struct TestContext {
        vars: HashMap<String, VarValue>,
    }

    impl TestContext {
        fn new() -> Self {
            Self {
                vars: HashMap::new(),
            }
        }

        fn with_var(mut self, name: &str, value: VarValue) -> Self {
            self.vars.insert(name.to_string(), value);
            self
        }
    }

    impl EvalContext for TestContext {
        fn get_var(&self, name: &str) -> Option<&VarValue> {
            self.vars.get(name)
        }

        fn object_id(&self) -> &str {
            "door"
        }

        fn scene_id(&self) -> &str {
            "hall"
        }
    }

    /// 解析 `LOG(<expr>)` 中的表达式
    fn expr(source: &str) -> Expr {
        let stmts = parse(lex(&format!("LOG({source})")).unwrap()).unwrap();
        match stmts.into_iter().next() {
            Some(Stmt::Call { mut call, .. }) => call.args.remove(0),
            other => panic!("期望调用，实际 {other:?}"),
        }
    }

    fn eval(source: &str, ctx: &TestContext) -> Result<VarValue, RuntimeError> {
        evaluate(&expr(source), ctx)
    }

    #[test]
    fn test_literals_and_ids() {
        let ctx = TestContext::new();
        assert_eq!(eval("'hi'", &ctx).unwrap(), VarValue::from("hi"));
        assert_eq!(eval("42", &ctx).unwrap(), VarValue::Int(42));
        assert_eq!(eval("OBJECT", &ctx).unwrap(), VarValue::from("door"));
        assert_eq!(eval("SCENE", &ctx).unwrap(), VarValue::from("hall"));
    }

    #[test]
    fn test_arithmetic() {
        let ctx = TestContext::new();
        assert_eq!(eval("1 + 2 - 4", &ctx).unwrap(), VarValue::Int(-1));
        assert_eq!(eval("1 + 0.5", &ctx).unwrap(), VarValue::Float(1.5));
        assert_eq!(eval("-(2 - 5)", &ctx).unwrap(), VarValue::Int(3));
        assert_eq!(eval("'n=' + 3", &ctx).unwrap(), VarValue::from("n=3"));
        assert!(matches!(
            eval("true + 1", &ctx),
            Err(RuntimeError::TypeMismatch { expected: "number", .. })
        ));
    }

    #[test]
    fn test_comparisons() {
        let ctx = TestContext::new();
        assert_eq!(eval("1 < 2", &ctx).unwrap(), VarValue::Bool(true));
        assert_eq!(eval("2 <= 2.0", &ctx).unwrap(), VarValue::Bool(true));
        assert_eq!(eval("'b' > 'a'", &ctx).unwrap(), VarValue::Bool(true));
        assert_eq!(eval("1 == 1.0", &ctx).unwrap(), VarValue::Bool(true));
        assert_eq!(eval("'1' == 1", &ctx).unwrap(), VarValue::Bool(false));
        assert_eq!(eval("OBJECT != 'door'", &ctx).unwrap(), VarValue::Bool(false));
        assert!(eval("'a' < 1", &ctx).is_err());
    }

    #[test]
    fn test_get_with_default() {
        let ctx = TestContext::new().with_var("keys", VarValue::Int(2));
        assert_eq!(eval("GET('keys')", &ctx).unwrap(), VarValue::Int(2));
        assert_eq!(eval("GET('coins', 0) + 1", &ctx).unwrap(), VarValue::Int(1));
        assert_eq!(
            eval("GET('coins')", &ctx),
            Err(RuntimeError::UndefinedVariable {
                name: "coins".to_string()
            })
        );
        assert!(matches!(
            eval("GET(1)", &ctx),
            Err(RuntimeError::TypeMismatch { expected: "string", .. })
        ));
    }

    #[test]
    fn test_logic_is_strict_and_short_circuits() {
        let ctx = TestContext::new();
        assert_eq!(eval("true and not false", &ctx).unwrap(), VarValue::Bool(true));
        // 右侧未定义变量不会被求值
        assert_eq!(eval("false and GET('x')", &ctx).unwrap(), VarValue::Bool(false));
        assert_eq!(eval("true or GET('x')", &ctx).unwrap(), VarValue::Bool(true));
        assert!(matches!(
            eval("1 and true", &ctx),
            Err(RuntimeError::TypeMismatch { expected: "bool", .. })
        ));
        assert!(evaluate_to_bool(&expr("'yes'"), &ctx).is_err());
    }
}
