//! 校验规则引擎
//!
//! 在业务记录上执行校验规则表达式，报告被违反的规则。提供：
//! - 表达式词法、语法分析和类型化求值
//! - 内置函数 `ISBLANK`、`TODAY`、`AND`、`OR`
//! - 按表达式原文缓存的编译器
//! - 规则存储接口与内存实现
//! - 失败即触发的规则引擎门面

pub mod ast;
pub mod compiler;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod models;
pub mod parser;
pub mod seed;
pub mod store;
pub mod value;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use compiler::{CompiledExpression, CompilerStats, EngineLimits, RuleCompiler};
pub use engine::RuleEngine;
pub use error::{EvalError, LexError, ParseError, Result, RuleError};
pub use evaluator::Evaluator;
pub use functions::{Arity, FunctionRegistry};
pub use lexer::{Token, TokenKind, tokenize};
pub use models::{
    EvaluationOutcome, EvaluationResponse, ExpressionTestResult, FieldRecord, NewRule, Rule,
    RuleDiagnostic, RulePatch, RuleReport,
};
pub use parser::{Parser, parse};
pub use store::{InMemoryRuleStore, RuleStore};
pub use value::Value;
