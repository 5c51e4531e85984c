//! 规则管理 API 处理器
//!
//! 保存前先编译表达式，无法编译的规则不会写入存储。
//! 规则的增删改都经过引擎，表达式被替换或删除时同步清理编译缓存。

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rule_engine::Rule;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{CreateRuleRequest, MessageResponse, UpdateRuleRequest},
    error::ApiError,
    state::AppState,
};

/// 获取全部规则，按对象类型升序、创建时间降序
///
/// GET /api/validation_rules
pub async fn list_rules(State(state): State<AppState>) -> Result<Json<Vec<Rule>>, ApiError> {
    let rules = state.engine.store().list_all().await?;
    Ok(Json(rules))
}

/// 创建规则
///
/// POST /api/validation_rules
pub async fn create_rule(
    State(state): State<AppState>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<(StatusCode, Json<Rule>), ApiError> {
    req.validate()?;

    let rule = state.engine.create_rule(req.into()).await?;

    info!(
        rule_id = %rule.id,
        object_type = %rule.object_type,
        "Validation rule created"
    );

    Ok((StatusCode::CREATED, Json(rule)))
}

/// 部分更新规则
///
/// PUT /api/validation_rules/{id}
pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRuleRequest>,
) -> Result<Json<Rule>, ApiError> {
    req.validate()?;

    let rule = state.engine.update_rule(id, req.into()).await?;

    info!(rule_id = %rule.id, "Validation rule updated");

    Ok(Json(rule))
}

/// 删除规则
///
/// DELETE /api/validation_rules/{id}
pub async fn delete_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.engine.delete_rule(id).await?;

    info!(rule_id = %id, "Validation rule deleted");

    Ok(Json(MessageResponse::new(
        "Validation rule deleted successfully",
    )))
}
