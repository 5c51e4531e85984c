//! 表达式运行时值
//!
//! 表达式语言只操作五种值：空值、布尔、数值、文本、日期。值一经构造即不可变。

use chrono::{DateTime, NaiveDate};
use std::fmt;

/// 运行时值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
}

impl Value {
    /// 获取值的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "text",
            Self::Date(_) => "date",
        }
    }

    /// 空值或空字符串视为空白
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// 数值，或可解析为有限数值的文本（如表单提交的 "150"）
    pub(crate) fn numeric(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_number(s),
            _ => None,
        }
    }

    /// 日期，或可解析为日期的文本（`YYYY-MM-DD` 或 RFC 3339）
    pub(crate) fn date_like(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// 从 JSON 表单值转换，数组和对象不受支持
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Boolean(*b)),
            serde_json::Value::Number(n) => n.as_f64().map(Self::Number),
            serde_json::Value::String(s) => Some(Self::Text(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

/// 解析有限数值，拒绝 `inf`、`NaN` 之类的特殊写法
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// 解析日期文本
pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    DateTime::parse_from_rfc3339(trimmed)
        .ok()
        .map(|dt| dt.date_naive())
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(true) => write!(f, "TRUE"),
            Self::Boolean(false) => write!(f, "FALSE"),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Self::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_blank() {
        assert!(Value::Null.is_blank());
        assert!(Value::from("").is_blank());
        assert!(!Value::from(" ").is_blank());
        assert!(!Value::from(0.0).is_blank());
        assert!(!Value::from(false).is_blank());
    }

    #[test]
    fn test_numeric_text() {
        assert_eq!(Value::from("150").numeric(), Some(150.0));
        assert_eq!(Value::from(" 2.5 ").numeric(), Some(2.5));
        assert_eq!(Value::from("abc").numeric(), None);
        assert_eq!(Value::from("inf").numeric(), None);
        assert_eq!(Value::from("NaN").numeric(), None);
        assert_eq!(Value::from("").numeric(), None);
        assert_eq!(Value::Null.numeric(), None);
    }

    #[test]
    fn test_date_like() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(Value::from("2024-01-15").date_like(), Some(expected));
        assert_eq!(Value::from("2024-01-15T10:00:00Z").date_like(), Some(expected));
        assert_eq!(Value::Date(expected).date_like(), Some(expected));
        assert_eq!(Value::from("2024-13-01").date_like(), None);
        assert_eq!(Value::from(20240115.0).date_like(), None);
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Value::from_json(&json!(null)), Some(Value::Null));
        assert_eq!(Value::from_json(&json!(true)), Some(Value::Boolean(true)));
        assert_eq!(Value::from_json(&json!(150)), Some(Value::Number(150.0)));
        assert_eq!(Value::from_json(&json!("High")), Some(Value::from("High")));
        assert_eq!(Value::from_json(&json!([1, 2])), None);
        assert_eq!(Value::from_json(&json!({"a": 1})), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::from(5.0).to_string(), "5");
        assert_eq!(Value::from(5.5).to_string(), "5.5");
        assert_eq!(Value::from(true).to_string(), "TRUE");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap()).to_string(),
            "2020-01-01"
        );
    }
}
