//! 规则引擎领域模型

use crate::error::{Result, RuleError};
use crate::value::Value;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 待校验的记录：字段名到值的映射
///
/// 字段名大小写敏感，未提交的字段读取为 Null。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRecord {
    fields: HashMap<String, Value>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    /// 链式构造
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// 从 JSON 表单数据构造记录
    ///
    /// 字符串、数值、布尔、null 分别转换为 Text、Number、Boolean、Null；
    /// 数组和对象不是合法的字段值。
    pub fn from_json_map(form_data: &serde_json::Map<String, serde_json::Value>) -> Result<Self> {
        let mut fields = HashMap::with_capacity(form_data.len());

        for (name, raw) in form_data {
            let value =
                Value::from_json(raw).ok_or_else(|| RuleError::UnsupportedFieldValue {
                    field: name.clone(),
                    value_type: json_type_name(raw).to_string(),
                })?;
            fields.insert(name.clone(), value);
        }

        Ok(Self { fields })
    }

    /// 从任意 JSON 值构造记录，顶层必须是对象
    pub fn from_json(form_data: &serde_json::Value) -> Result<Self> {
        match form_data {
            serde_json::Value::Object(map) => Self::from_json_map(map),
            other => Err(RuleError::InvalidFormData(json_type_name(other).to_string())),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// 校验规则定义
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: Uuid,
    /// 规则作用的业务对象类型，如 WorkOrder
    pub object_type: String,
    /// 规则表达式，结果为 true 表示校验不通过
    pub expression: String,
    pub error_message: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_by: Option<Uuid>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Rule {
    pub fn new(
        object_type: impl Into<String>,
        expression: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            object_type: object_type.into(),
            expression: expression.into(),
            error_message: error_message.into(),
            is_active: true,
            created_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn from_new(input: NewRule) -> Self {
        let mut rule = Self::new(input.object_type, input.expression, input.error_message);
        rule.is_active = input.is_active;
        rule.created_by = input.created_by;
        rule
    }

    /// 应用部分更新并刷新 updated_at
    pub fn apply(&mut self, patch: RulePatch) {
        if let Some(object_type) = patch.object_type {
            self.object_type = object_type;
        }
        if let Some(expression) = patch.expression {
            self.expression = expression;
        }
        if let Some(error_message) = patch.error_message {
            self.error_message = error_message;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
        self.updated_at = Utc::now();
    }
}

/// 创建规则的输入
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRule {
    pub object_type: String,
    pub expression: String,
    pub error_message: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl NewRule {
    pub fn new(
        object_type: impl Into<String>,
        expression: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            expression: expression.into(),
            error_message: error_message.into(),
            is_active: true,
            created_by: None,
        }
    }
}

/// 规则部分更新，未提供的字段保持不变
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulePatch {
    pub object_type: Option<String>,
    pub expression: Option<String>,
    pub error_message: Option<String>,
    pub is_active: Option<bool>,
}

impl RulePatch {
    pub fn is_empty(&self) -> bool {
        self.object_type.is_none()
            && self.expression.is_none()
            && self.error_message.is_none()
            && self.is_active.is_none()
    }
}

/// 规则编译或求值失败的诊断信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDiagnostic {
    pub rule_id: Uuid,
    /// 错误类别码，见 `RuleError::kind`
    pub kind: String,
    pub message: String,
}

/// 单条规则的执行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    pub rule_id: Uuid,
    pub fired: bool,
    pub error: Option<RuleDiagnostic>,
}

/// 一次校验的完整结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// 触发规则的错误消息，按规则顺序排列，允许重复
    pub messages: Vec<String>,
    pub reports: Vec<RuleReport>,
}

impl EvaluationOutcome {
    pub fn is_valid(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn fired_count(&self) -> usize {
        self.reports.iter().filter(|r| r.fired).count()
    }

    pub fn diagnostics(&self) -> impl Iterator<Item = &RuleDiagnostic> {
        self.reports.iter().filter_map(|r| r.error.as_ref())
    }

    pub fn into_response(self) -> EvaluationResponse {
        EvaluationResponse {
            success: self.messages.is_empty(),
            errors: self.messages,
        }
    }
}

/// 对外的校验响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationResponse {
    pub success: bool,
    pub errors: Vec<String>,
}

/// 单个表达式的试运行结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionTestResult {
    pub fired: bool,
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_from_json() {
        let record = FieldRecord::from_json(&json!({
            "Priority": null,
            "Estimated_Cost": 150,
            "Status": "Open",
            "Urgent": false
        }))
        .unwrap();

        assert_eq!(record.get("Priority"), Some(&Value::Null));
        assert_eq!(record.get("Estimated_Cost"), Some(&Value::Number(150.0)));
        assert_eq!(record.get("Status"), Some(&Value::from("Open")));
        assert_eq!(record.get("Urgent"), Some(&Value::Boolean(false)));
        assert_eq!(record.get("priority"), None);
    }

    #[test]
    fn test_record_rejects_nested_values() {
        let err = FieldRecord::from_json(&json!({"Tags": ["a", "b"]})).unwrap_err();
        assert!(matches!(
            err,
            RuleError::UnsupportedFieldValue { ref field, ref value_type }
                if field == "Tags" && value_type == "array"
        ));

        let err = FieldRecord::from_json(&json!([1, 2])).unwrap_err();
        assert_eq!(err.kind(), "INVALID_FORM_DATA");
    }

    #[test]
    fn test_record_from_iter() {
        let record: FieldRecord = [("A", 1.0), ("B", 2.0)].into_iter().collect();
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("B"), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_rule_deserialize_defaults() {
        let rule: Rule = serde_json::from_value(json!({
            "id": "0191e6d4-3b4a-7c2e-9a51-7a3f1e2d4c5b",
            "object_type": "WorkOrder",
            "expression": "ISBLANK(Priority)",
            "error_message": "Priority is required."
        }))
        .unwrap();

        assert!(rule.is_active);
        assert!(rule.created_by.is_none());
    }

    #[test]
    fn test_rule_apply_patch() {
        let mut rule = Rule::new("WorkOrder", "ISBLANK(Priority)", "Priority is required.");
        let before = rule.updated_at;

        rule.apply(RulePatch {
            is_active: Some(false),
            ..Default::default()
        });

        assert!(!rule.is_active);
        assert_eq!(rule.expression, "ISBLANK(Priority)");
        assert!(rule.updated_at >= before);
    }

    #[test]
    fn test_outcome_into_response() {
        let outcome = EvaluationOutcome {
            messages: vec!["Priority is required.".to_string()],
            reports: vec![],
        };
        assert!(!outcome.is_valid());

        let response = outcome.into_response();
        assert!(!response.success);
        assert_eq!(response.errors, vec!["Priority is required.".to_string()]);

        assert!(EvaluationOutcome::default().into_response().success);
    }
}
