//! 健康检查

use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::state::AppState;

pub const SERVICE_NAME: &str = "validation-service";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查规则存储是否可用
///
/// 内存存储始终可用；PostgreSQL 存储执行一次 `SELECT 1`。
pub async fn readiness_check(State(state): State<AppState>) -> Json<Value> {
    let (backend, store_ok) = match &state.database {
        Some(db) => ("postgres", db.health_check().await.is_ok()),
        None => ("memory", true),
    };

    Json(json!({
        "status": if store_ok { "ok" } else { "degraded" },
        "service": SERVICE_NAME,
        "checks": {
            "store": if store_ok { "ok" } else { "fail" },
            "backend": backend
        }
    }))
}
