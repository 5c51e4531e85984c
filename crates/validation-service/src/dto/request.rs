//! 请求 DTO 定义

use rule_engine::{NewRule, RulePatch};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

/// 表单校验请求
///
/// 字段均为可选，缺失时由 `validate` 给出与其他错误一致的提示，
/// 而不是由 JSON 反序列化直接拒绝。
#[derive(Debug, Deserialize, Validate)]
pub struct EvaluateRequest {
    #[validate(
        required(message = "object_type is required"),
        length(min = 1, max = 255, message = "object_type must be 1-255 characters")
    )]
    pub object_type: Option<String>,

    #[validate(required(message = "form_data is required"))]
    pub form_data: Option<Value>,
}

impl EvaluateRequest {
    /// 校验并拆出对象类型与表单字段
    pub fn into_parts(self) -> Result<(String, Map<String, Value>), Vec<String>> {
        if let Err(errors) = self.validate() {
            return Err(validation_messages(&errors));
        }

        match (self.object_type, self.form_data) {
            (Some(object_type), Some(Value::Object(form_data))) => Ok((object_type, form_data)),
            (_, Some(_)) => Err(vec!["form_data must be an object".to_string()]),
            _ => Err(vec!["object_type and form_data are required".to_string()]),
        }
    }
}

/// 表达式试运行请求
#[derive(Debug, Deserialize, Validate)]
pub struct TestExpressionRequest {
    #[validate(length(min = 1, max = 4096, message = "表达式长度必须在1-4096个字符之间"))]
    pub expression: String,
    #[serde(default)]
    pub form_data: Map<String, Value>,
}

/// 创建规则请求
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRuleRequest {
    #[validate(length(min = 1, max = 255, message = "对象类型长度必须在1-255个字符之间"))]
    pub object_type: String,
    #[validate(length(min = 1, max = 4096, message = "表达式长度必须在1-4096个字符之间"))]
    pub expression: String,
    #[validate(length(min = 1, max = 1000, message = "错误消息长度必须在1-1000个字符之间"))]
    pub error_message: String,
    pub is_active: Option<bool>,
    pub created_by: Option<Uuid>,
}

impl From<CreateRuleRequest> for NewRule {
    fn from(req: CreateRuleRequest) -> Self {
        let mut rule = NewRule::new(req.object_type, req.expression, req.error_message);
        rule.is_active = req.is_active.unwrap_or(true);
        rule.created_by = req.created_by;
        rule
    }
}

/// 更新规则请求，未提供的字段保持不变
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRuleRequest {
    #[validate(length(min = 1, max = 255, message = "对象类型长度必须在1-255个字符之间"))]
    pub object_type: Option<String>,
    #[validate(length(min = 1, max = 4096, message = "表达式长度必须在1-4096个字符之间"))]
    pub expression: Option<String>,
    #[validate(length(min = 1, max = 1000, message = "错误消息长度必须在1-1000个字符之间"))]
    pub error_message: Option<String>,
    pub is_active: Option<bool>,
}

impl From<UpdateRuleRequest> for RulePatch {
    fn from(req: UpdateRuleRequest) -> Self {
        Self {
            object_type: req.object_type,
            expression: req.expression,
            error_message: req.error_message,
            is_active: req.is_active,
        }
    }
}

/// 将 validator 的错误展开为按字段名排序的消息列表
pub fn validation_messages(errors: &ValidationErrors) -> Vec<String> {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect()
}
