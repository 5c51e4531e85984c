//! 路由配置模块

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::{handlers, state::AppState};

/// 校验规则相关路由，挂载在 `/api/validation_rules` 下
pub fn validation_rule_routes() -> Router<AppState> {
    Router::new()
        .route("/evaluate", post(handlers::evaluate::evaluate))
        .route("/test", post(handlers::evaluate::test_expression))
        .route(
            "/",
            get(handlers::rule::list_rules).post(handlers::rule::create_rule),
        )
        .route(
            "/{id}",
            put(handlers::rule::update_rule).delete(handlers::rule::delete_rule),
        )
}

/// 构建 API 路由（`/api` 前缀下）
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/validation_rules", validation_rule_routes())
}

/// 构建完整应用路由，包含健康检查
///
/// 跨域、超时和可观测性中间件由 main 按配置叠加。
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .with_state(state)
}
