//! 表达式语法树

use crate::value::Value;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }
}

/// 表达式节点
///
/// 语法树构造后不再修改，可以在多个线程间共享同一棵树并发求值。
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    /// 字段引用，求值时从记录中取值，缺失即为 Null
    Field(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// 函数调用，参数个数在求值时校验
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }

    /// 收集表达式引用的全部字段名
    pub fn referenced_fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    /// 语法树高度，叶子节点为 1
    ///
    /// 使用显式栈遍历，任意形状的树都不会耗尽调用栈。
    pub fn height(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(self, 1usize)];

        while let Some((expr, level)) = stack.pop() {
            max = max.max(level);
            match expr {
                Self::Literal(_) | Self::Field(_) => {}
                Self::Unary { operand, .. } => stack.push((operand.as_ref(), level + 1)),
                Self::Binary { left, right, .. } => {
                    stack.push((left.as_ref(), level + 1));
                    stack.push((right.as_ref(), level + 1));
                }
                Self::Call { args, .. } => {
                    stack.extend(args.iter().map(|arg| (arg, level + 1)));
                }
            }
        }

        max
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            Self::Literal(_) => {}
            Self::Field(name) => {
                fields.insert(name.clone());
            }
            Self::Unary { operand, .. } => operand.collect_fields(fields),
            Self::Binary { left, right, .. } => {
                left.collect_fields(fields);
                right.collect_fields(fields);
            }
            Self::Call { args, .. } => {
                for arg in args {
                    arg.collect_fields(fields);
                }
            }
        }
    }
}

/// 规范化输出，二元运算一律加括号，用于日志和诊断
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(Value::Text(s)) => {
                write!(f, "\"")?;
                for ch in s.chars() {
                    if ch == '"' || ch == '\\' {
                        write!(f, "\\")?;
                    }
                    write!(f, "{}", ch)?;
                }
                write!(f, "\"")
            }
            Self::Literal(Value::Date(d)) => write!(f, "\"{}\"", d.format("%Y-%m-%d")),
            Self::Literal(value) => write!(f, "{}", value),
            Self::Field(name) => write!(f, "{}", name),
            Self::Unary {
                op: UnaryOp::Neg,
                operand,
            } => write!(f, "-({})", operand),
            Self::Binary { op, left, right } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Self::Call { name, args } => {
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
