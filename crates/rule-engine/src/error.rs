//! 规则引擎错误类型
//!
//! 表达式相关的错误分三层：词法（LexError）、语法（ParseError）、求值（EvalError），
//! 由 `RuleError` 统一包装。前三者在规则引擎门面中按“失败即触发”策略处理，
//! 存储类错误则直接向调用方传播。

use thiserror::Error;

/// 词法错误：无法识别的字符、未闭合的字符串等
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("词法错误 (位置 {position}): {message}")]
pub struct LexError {
    /// 出错字符在表达式中的字节偏移
    pub position: usize,
    pub message: String,
}

impl LexError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// 语法错误：括号不匹配、缺少操作数、多余的 token、表达式为空等
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("语法错误 (位置 {position}): {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// 求值错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("类型不匹配: 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
    },

    #[error("操作符 {operator} 不支持 {left} 与 {right} 之间的运算")]
    IncompatibleOperands {
        operator: String,
        left: String,
        right: String,
    },

    #[error("未知函数: {0}")]
    UnknownFunction(String),

    #[error("函数 {name} 参数数量错误: 期望 {expected}, 实际 {actual}")]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    #[error("除数为零")]
    DivisionByZero,

    #[error("数值运算结果超出范围")]
    NumericOverflow,

    #[error("规则表达式的结果必须为布尔值, 实际为 {0}")]
    NonBooleanResult(String),
}

/// 规则引擎统一错误
#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("规则未找到: {0}")]
    RuleNotFound(String),

    #[error("规则存储错误: {0}")]
    Store(String),

    #[error("字段 {field} 的值类型不受支持: {value_type}")]
    UnsupportedFieldValue { field: String, value_type: String },

    #[error("表单数据必须是 JSON 对象, 实际为 {0}")]
    InvalidFormData(String),
}

impl RuleError {
    /// 错误类别码，用于诊断日志和指标标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Lex(_) => "LEX_ERROR",
            Self::Parse(_) => "PARSE_ERROR",
            Self::Eval(_) => "EVAL_ERROR",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
            Self::UnsupportedFieldValue { .. } => "UNSUPPORTED_FIELD_VALUE",
            Self::InvalidFormData(_) => "INVALID_FORM_DATA",
        }
    }

    /// 是否为规则表达式本身的问题（编译或求值失败）
    ///
    /// 只有这类错误会被门面转换成“规则触发”，其余错误向调用方传播。
    pub fn is_expression_error(&self) -> bool {
        matches!(self, Self::Lex(_) | Self::Parse(_) | Self::Eval(_))
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
