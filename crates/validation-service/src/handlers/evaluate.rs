//! 表单校验 API 处理器
//!
//! `POST /evaluate` 的响应体固定为 `{success, errors}`，请求不合法或校验过程出错时
//! 也保持该结构，便于表单前端统一展示错误。

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use rule_engine::{EvaluationResponse, ExpressionTestResult, RuleError};
use tracing::{error, info, warn};
use validator::Validate;

use crate::{
    dto::{EvaluateRequest, TestExpressionRequest},
    error::ApiError,
    state::AppState,
};

const INVALID_REQUEST_PREFIX: &str = "Validation request is invalid: ";
const EVALUATION_FAILED: &str = "An error occurred during validation";

/// 按对象类型执行全部启用规则
///
/// POST /api/validation_rules/evaluate
///
/// 无规则触发返回 200，有规则触发返回 422 并按规则顺序列出错误消息。
pub async fn evaluate(
    State(state): State<AppState>,
    payload: Result<Json<EvaluateRequest>, JsonRejection>,
) -> (StatusCode, Json<EvaluationResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Validation request rejected");
            return invalid_request(vec![rejection.body_text()]);
        }
    };

    let (object_type, form_data) = match request.into_parts() {
        Ok(parts) => parts,
        Err(messages) => {
            warn!(errors = ?messages, "Validation request failed validation");
            return invalid_request(messages);
        }
    };

    info!(
        object_type = %object_type,
        field_count = form_data.len(),
        "Validation request received"
    );

    match state.engine.evaluate(&object_type, &form_data).await {
        Ok(response) if response.success => (StatusCode::OK, Json(response)),
        Ok(response) => (StatusCode::UNPROCESSABLE_ENTITY, Json(response)),
        Err(
            err @ (RuleError::UnsupportedFieldValue { .. } | RuleError::InvalidFormData(_)),
        ) => {
            warn!(error = %err, "Validation request has unsupported form data");
            invalid_request(vec![err.to_string()])
        }
        Err(err) => {
            error!(object_type = %object_type, error = %err, "Evaluation error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EvaluationResponse {
                    success: false,
                    errors: vec![EVALUATION_FAILED.to_string()],
                }),
            )
        }
    }
}

fn invalid_request(messages: Vec<String>) -> (StatusCode, Json<EvaluationResponse>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(EvaluationResponse {
            success: false,
            errors: vec![format!("{}{}", INVALID_REQUEST_PREFIX, messages.join(", "))],
        }),
    )
}

/// 试运行单个表达式，不读取也不写入规则存储
///
/// POST /api/validation_rules/test
///
/// 表达式出错时与正式校验一致视为触发，`error` 给出原因。
pub async fn test_expression(
    State(state): State<AppState>,
    Json(req): Json<TestExpressionRequest>,
) -> Result<Json<ExpressionTestResult>, ApiError> {
    req.validate()?;

    let result = state.engine.test_expression(&req.expression, &req.form_data)?;

    info!(
        expression = %req.expression,
        fired = result.fired,
        has_error = result.error.is_some(),
        "Expression tested"
    );

    Ok(Json(result))
}
