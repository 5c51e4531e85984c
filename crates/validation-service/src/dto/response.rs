//! 响应 DTO 定义
//!
//! 规则列表与详情直接序列化 `rule_engine::Rule`，校验结果使用
//! `rule_engine::EvaluationResponse`。

use serde::{Deserialize, Serialize};

/// 仅包含提示信息的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
