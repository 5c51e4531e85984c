//! 表达式求值器
//!
//! 在一条记录上对语法树求值。求值是纯函数，唯一的外部输入是 `TODAY()` 读取的当前日期，
//! 测试中可以通过 [`Evaluator::with_today`] 固定。

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::EvalError;
use crate::functions::{ArgEvaluator, FunctionRegistry};
use crate::models::FieldRecord;
use crate::value::Value;
use chrono::{Local, NaiveDate};
use std::cmp::Ordering;

/// 求值器，仅持有本次调用的只读上下文
pub struct Evaluator<'a> {
    record: &'a FieldRecord,
    today: NaiveDate,
    registry: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    /// 使用本地时钟的当前日期
    pub fn new(record: &'a FieldRecord) -> Self {
        Self::with_today(record, Local::now().date_naive())
    }

    pub fn with_today(record: &'a FieldRecord, today: NaiveDate) -> Self {
        Self {
            record,
            today,
            registry: FunctionRegistry::builtin(),
        }
    }

    pub fn with_registry(mut self, registry: &'a FunctionRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Field(name) => Ok(self.record.get(name).cloned().unwrap_or(Value::Null)),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => match self.evaluate(operand)? {
                Value::Number(n) => Ok(Value::Number(-n)),
                other => Err(EvalError::TypeMismatch {
                    expected: "number".to_string(),
                    actual: other.type_name().to_string(),
                }),
            },
            Expr::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, &left, &right)
            }
            Expr::Call { name, args } => self.registry.call(name, args, self),
        }
    }

    /// 求值规则谓词，结果必须为布尔值
    pub fn evaluate_predicate(&self, expr: &Expr) -> Result<bool, EvalError> {
        match self.evaluate(expr)? {
            Value::Boolean(b) => Ok(b),
            other => Err(EvalError::NonBooleanResult(other.type_name().to_string())),
        }
    }
}

impl ArgEvaluator for Evaluator<'_> {
    fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        self.evaluate(expr)
    }

    fn today(&self) -> NaiveDate {
        self.today
    }
}

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Eq => Ok(Value::Boolean(loose_eq(left, right))),
        BinaryOp::NotEq => Ok(Value::Boolean(!loose_eq(left, right))),
        BinaryOp::Lt => compare(op, left, right).map(|o| Value::Boolean(o == Ordering::Less)),
        BinaryOp::LtEq => {
            compare(op, left, right).map(|o| Value::Boolean(o != Ordering::Greater))
        }
        BinaryOp::Gt => compare(op, left, right).map(|o| Value::Boolean(o == Ordering::Greater)),
        BinaryOp::GtEq => compare(op, left, right).map(|o| Value::Boolean(o != Ordering::Less)),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            arithmetic(op, left, right)
        }
    }
}

fn arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(incompatible(op, left, right));
    };

    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Mod if *b == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
        _ => return Err(incompatible(op, left, right)),
    };

    if result.is_finite() {
        Ok(Value::Number(result))
    } else {
        Err(EvalError::NumericOverflow)
    }
}

/// 相等比较
///
/// 空值只等于空值；数值与可解析为数值的文本按数值比较，否则按数值的文本形式比较；
/// 日期与日期形式的文本按日期比较；其余跨类型组合视为不相等。
fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Number(a), Value::Number(b)) => number_eq(*a, *b),
        (Value::Number(n), Value::Text(s)) | (Value::Text(s), Value::Number(n)) => {
            match crate::value::parse_number(s) {
                Some(parsed) => number_eq(*n, parsed),
                None => Value::Number(*n).to_string() == *s,
            }
        }
        (Value::Text(a), Value::Text(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => a == b,
        (Value::Date(d), Value::Text(s)) | (Value::Text(s), Value::Date(d)) => {
            crate::value::parse_date(s).is_some_and(|parsed| parsed == *d)
        }
        _ => false,
    }
}

fn number_eq(a: f64, b: f64) -> bool {
    a == b
}

/// 关系比较，返回左右操作数的顺序
fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    let ordering = match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Date(a), Value::Date(b)) => Some(a.cmp(b)),
        (Value::Date(_), Value::Text(_)) | (Value::Text(_), Value::Date(_)) => {
            match (left.date_like(), right.date_like()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            }
        }
        (Value::Number(_), Value::Text(_)) | (Value::Text(_), Value::Number(_)) => {
            match (left.numeric(), right.numeric()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
        _ => None,
    };

    ordering.ok_or_else(|| incompatible(op, left, right))
}

fn incompatible(op: BinaryOp, left: &Value, right: &Value) -> EvalError {
    EvalError::IncompatibleOperands {
        operator: op.symbol().to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn eval_with(expr: &str, record: &FieldRecord) -> Result<Value, EvalError> {
        let ast = parse(expr).unwrap();
        Evaluator::with_today(record, date(2024, 6, 1)).evaluate(&ast)
    }

    fn eval(expr: &str) -> Result<Value, EvalError> {
        eval_with(expr, &FieldRecord::new())
    }

    fn truthy(expr: &str, record: &FieldRecord) -> bool {
        let ast = parse(expr).unwrap();
        Evaluator::with_today(record, date(2024, 6, 1))
            .evaluate_predicate(&ast)
            .unwrap()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), Value::Number(7.0));
        assert_eq!(eval("10 - 3 - 2").unwrap(), Value::Number(5.0));
        assert_eq!(eval("7 % 4").unwrap(), Value::Number(3.0));
        assert_eq!(eval("-(2 + 3)").unwrap(), Value::Number(-5.0));
        assert_eq!(eval("2 - -3").unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_arithmetic_errors() {
        assert_eq!(eval("1 / 0").unwrap_err(), EvalError::DivisionByZero);
        assert_eq!(eval("1 % 0").unwrap_err(), EvalError::DivisionByZero);
        assert!(matches!(
            eval("'a' + 'b'").unwrap_err(),
            EvalError::IncompatibleOperands { .. }
        ));
        assert!(matches!(
            eval("Missing + 1").unwrap_err(),
            EvalError::IncompatibleOperands { .. }
        ));
        assert!(matches!(
            eval("-'a'").unwrap_err(),
            EvalError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_overflow_is_error() {
        let big = format!("{} * {}", "9".repeat(300), "9".repeat(300));
        assert_eq!(eval(&big).unwrap_err(), EvalError::NumericOverflow);
    }

    #[test]
    fn test_equality() {
        let record = FieldRecord::new()
            .with("Cost", 0.0)
            .with("Status", "Open")
            .with("Text_Cost", "150")
            .with("Flag", true);

        assert!(truthy("Cost = 0", &record));
        assert!(truthy("Cost == 0.0", &record));
        assert!(truthy("Status = \"Open\"", &record));
        assert!(truthy("Status != 'Closed'", &record));
        assert!(truthy("Text_Cost = 150", &record));
        assert!(truthy("150 = Text_Cost", &record));
        assert!(!truthy("Status = 1", &record));
        assert!(!truthy("Flag = 'true'", &record));
    }

    #[test]
    fn test_small_numbers_are_distinct() {
        let record = FieldRecord::new().with("Rate", 0.0000000000000001);

        // 精确比较，极小的非零值不等于零
        assert!(!truthy("0.0000000000000001 = 0", &record));
        assert!(!truthy("0.00000000000000001 = 0.00000000000000002", &record));
        assert!(!truthy("Rate = 0", &record));
        assert!(truthy("Rate != 0", &record));
        assert!(truthy("100 = 100.0", &record));
    }

    #[test]
    fn test_null_equality() {
        let record = FieldRecord::new().with("Priority", Value::Null);
        assert!(!truthy("Priority = 0", &record));
        assert!(!truthy("Priority = ''", &record));
        assert!(truthy("Priority = Missing", &record));
        assert!(truthy("Priority != 'High'", &record));
    }

    #[test]
    fn test_comparison() {
        let record = FieldRecord::new()
            .with("Price", 10.0)
            .with("Name", "beta")
            .with("Start_Date", "2020-01-01")
            .with("End_Date", "2020-01-01")
            .with("Qty", "5");

        assert!(truthy("Price <= 10", &record));
        assert!(truthy("Name > 'alpha'", &record));
        assert!(truthy("Start_Date < TODAY()", &record));
        assert!(truthy("End_Date <= Start_Date", &record));
        assert!(truthy("Qty < 10", &record));
        assert!(truthy("Qty >= 5", &record));
    }

    #[test]
    fn test_comparison_errors() {
        let record = FieldRecord::new()
            .with("Flag", true)
            .with("Name", "abc");

        assert!(eval_with("Missing < 1", &record).is_err());
        assert!(eval_with("Flag > 0", &record).is_err());
        assert!(eval_with("Name < 1", &record).is_err());
        assert!(eval_with("Name < TODAY()", &record).is_err());
        assert!(eval_with("TODAY() < 1", &record).is_err());
    }

    #[test]
    fn test_predicate_requires_boolean() {
        let ast = parse("1 + 1").unwrap();
        let record = FieldRecord::new();
        let err = Evaluator::new(&record).evaluate_predicate(&ast).unwrap_err();
        assert_eq!(err, EvalError::NonBooleanResult("number".to_string()));
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            eval("NOW()").unwrap_err(),
            EvalError::UnknownFunction("NOW".to_string())
        );
    }

    #[test]
    fn test_logical_functions() {
        let record = FieldRecord::new().with("Status", "Open");
        assert!(truthy("AND(Status = \"Open\", ISBLANK(Priority))", &record));

        let record = FieldRecord::new()
            .with("Status", "Open")
            .with("Priority", "High");
        assert!(!truthy("AND(Status = \"Open\", ISBLANK(Priority))", &record));

        let record = FieldRecord::new().with("A", 1.0).with("B", 2.0).with("C", 0.0);
        assert!(truthy("OR(AND(A = 1, B = 2), C = 3)", &record));

        let record = FieldRecord::new().with("A", 1.0).with("B", 5.0).with("C", 0.0);
        assert!(!truthy("OR(AND(A = 1, B = 2), C = 3)", &record));
    }

    #[test]
    fn test_does_not_mutate_record() {
        let record = FieldRecord::new().with("Cost", 5.0);
        let before = record.clone();
        let _ = eval_with("Cost * 2 = 10", &record);
        assert_eq!(record, before);
    }
}
