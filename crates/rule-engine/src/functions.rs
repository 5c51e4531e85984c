//! 内置函数注册表
//!
//! 函数接收未求值的参数表达式和求值上下文，由函数自行决定求值顺序，
//! `AND` / `OR` 借此实现从左到右的短路求值。

use crate::ast::Expr;
use crate::error::EvalError;
use crate::value::Value;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// 函数求值所需的上下文
pub trait ArgEvaluator {
    /// 求值一个参数表达式
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError>;

    /// 本次求值使用的当前日期
    fn today(&self) -> NaiveDate;
}

/// 函数签名
pub type BuiltinFn = fn(&[Expr], &dyn ArgEvaluator) -> Result<Value, EvalError>;

/// 参数个数约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::Exact(n) => count == *n,
            Self::AtLeast(n) => count >= *n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(n) => write!(f, "{}", n),
            Self::AtLeast(n) => write!(f, "至少 {}", n),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub arity: Arity,
    pub call: BuiltinFn,
}

/// 函数注册表，名称大小写敏感
pub struct FunctionRegistry {
    functions: HashMap<&'static str, FunctionSpec>,
}

static BUILTIN: LazyLock<FunctionRegistry> = LazyLock::new(FunctionRegistry::new);

impl FunctionRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            functions: HashMap::new(),
        };

        registry.register("ISBLANK", Arity::Exact(1), fn_isblank);
        registry.register("TODAY", Arity::Exact(0), fn_today);
        registry.register("AND", Arity::AtLeast(2), fn_and);
        registry.register("OR", Arity::AtLeast(2), fn_or);

        registry
    }

    /// 进程内共享的内置函数表
    pub fn builtin() -> &'static FunctionRegistry {
        &BUILTIN
    }

    pub fn register(&mut self, name: &'static str, arity: Arity, call: BuiltinFn) {
        self.functions
            .insert(name, FunctionSpec { name, arity, call });
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }

    /// 查找函数、校验参数个数并调用
    pub fn call(
        &self,
        name: &str,
        args: &[Expr],
        ctx: &dyn ArgEvaluator,
    ) -> Result<Value, EvalError> {
        let spec = self
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;

        if !spec.arity.accepts(args.len()) {
            return Err(EvalError::ArityMismatch {
                name: spec.name.to_string(),
                expected: spec.arity.to_string(),
                actual: args.len(),
            });
        }

        (spec.call)(args, ctx)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn fn_isblank(args: &[Expr], ctx: &dyn ArgEvaluator) -> Result<Value, EvalError> {
    let value = ctx.eval(&args[0])?;
    Ok(Value::Boolean(value.is_blank()))
}

fn fn_today(_args: &[Expr], ctx: &dyn ArgEvaluator) -> Result<Value, EvalError> {
    Ok(Value::Date(ctx.today()))
}

fn fn_and(args: &[Expr], ctx: &dyn ArgEvaluator) -> Result<Value, EvalError> {
    for arg in args {
        if !expect_bool(ctx.eval(arg)?)? {
            return Ok(Value::Boolean(false));
        }
    }
    Ok(Value::Boolean(true))
}

fn fn_or(args: &[Expr], ctx: &dyn ArgEvaluator) -> Result<Value, EvalError> {
    for arg in args {
        if expect_bool(ctx.eval(arg)?)? {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}

fn expect_bool(value: Value) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| EvalError::TypeMismatch {
        expected: "boolean".to_string(),
        actual: value.type_name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// 按字面量求值，并记录被求值过的参数
    struct RecordingCtx {
        seen: RefCell<Vec<String>>,
    }

    impl RecordingCtx {
        fn new() -> Self {
            Self {
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArgEvaluator for RecordingCtx {
        fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
            self.seen.borrow_mut().push(expr.to_string());
            match expr {
                Expr::Literal(v) => Ok(v.clone()),
                Expr::Field(_) => Ok(Value::Null),
                _ => Err(EvalError::DivisionByZero),
            }
        }

        fn today(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
        }
    }

    #[test]
    fn test_isblank() {
        let ctx = RecordingCtx::new();
        let registry = FunctionRegistry::builtin();

        let r = registry.call("ISBLANK", &[Expr::field("Missing")], &ctx).unwrap();
        assert_eq!(r, Value::Boolean(true));

        let r = registry.call("ISBLANK", &[Expr::literal("")], &ctx).unwrap();
        assert_eq!(r, Value::Boolean(true));

        let r = registry.call("ISBLANK", &[Expr::literal("High")], &ctx).unwrap();
        assert_eq!(r, Value::Boolean(false));
    }

    #[test]
    fn test_today() {
        let ctx = RecordingCtx::new();
        let r = FunctionRegistry::builtin().call("TODAY", &[], &ctx).unwrap();
        assert_eq!(r, Value::Date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
    }

    #[test]
    fn test_and_short_circuits() {
        let ctx = RecordingCtx::new();
        let args = vec![
            Expr::literal(false),
            Expr::binary(crate::ast::BinaryOp::Div, Expr::literal(1.0), Expr::literal(0.0)),
        ];
        let r = FunctionRegistry::builtin().call("AND", &args, &ctx).unwrap();
        assert_eq!(r, Value::Boolean(false));
        assert_eq!(ctx.seen.borrow().len(), 1);
    }

    #[test]
    fn test_or_short_circuits() {
        let ctx = RecordingCtx::new();
        let args = vec![Expr::literal(false), Expr::literal(true), Expr::literal(1.0)];
        let r = FunctionRegistry::builtin().call("OR", &args, &ctx).unwrap();
        assert_eq!(r, Value::Boolean(true));
        assert_eq!(ctx.seen.borrow().len(), 2);
    }

    #[test]
    fn test_logical_requires_boolean() {
        let ctx = RecordingCtx::new();
        let args = vec![Expr::literal(true), Expr::literal("yes")];
        let err = FunctionRegistry::builtin().call("AND", &args, &ctx).unwrap_err();
        assert!(matches!(err, EvalError::TypeMismatch { .. }));
    }

    #[test]
    fn test_arity() {
        let ctx = RecordingCtx::new();
        let registry = FunctionRegistry::builtin();

        let err = registry.call("ISBLANK", &[], &ctx).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { actual: 0, .. }));

        let err = registry.call("TODAY", &[Expr::literal(1.0)], &ctx).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { actual: 1, .. }));

        let err = registry.call("AND", &[Expr::literal(true)], &ctx).unwrap_err();
        assert!(matches!(err, EvalError::ArityMismatch { actual: 1, .. }));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let ctx = RecordingCtx::new();
        let err = FunctionRegistry::builtin()
            .call("isblank", &[Expr::literal("")], &ctx)
            .unwrap_err();
        assert_eq!(err, EvalError::UnknownFunction("isblank".to_string()));
    }
}
