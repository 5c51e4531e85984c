//! 校验服务错误类型定义

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rule_engine::RuleError;
use serde_json::json;
use uuid::Uuid;

/// 规则管理接口的错误类型
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 表达式无法编译，message 含出错位置
    #[error("表达式无效: {0}")]
    InvalidExpression(String),

    #[error("规则不存在: {0}")]
    RuleNotFound(Uuid),

    #[error("规则存储错误: {0}")]
    Store(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InvalidExpression(_) => StatusCode::BAD_REQUEST,
            Self::RuleNotFound(_) => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidExpression(_) => "INVALID_EXPRESSION",
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Store(e) => {
                tracing::error!(error = %e, "规则存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 从规则引擎错误转换
///
/// 表达式类错误在管理接口中是请求方的问题，映射为 400。
impl From<RuleError> for ApiError {
    fn from(err: RuleError) -> Self {
        match err {
            RuleError::Lex(_) | RuleError::Parse(_) | RuleError::Eval(_) => {
                Self::InvalidExpression(err.to_string())
            }
            RuleError::RuleNotFound(id) => match Uuid::parse_str(&id) {
                Ok(id) => Self::RuleNotFound(id),
                Err(_) => Self::Internal(format!("规则 ID 格式异常: {}", id)),
            },
            RuleError::UnsupportedFieldValue { .. } | RuleError::InvalidFormData(_) => {
                Self::Validation(err.to_string())
            }
            RuleError::Store(msg) => Self::Store(msg),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiError>;
