//! 校验规则服务入口

use std::sync::Arc;
use std::time::Duration;

use axum::{http::HeaderValue, middleware};
use rule_engine::{EngineLimits, InMemoryRuleStore, RuleEngine, RuleStore, seed};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};
use validation_service::{
    AppState, PgRuleStore, handlers::health::SERVICE_NAME, routes,
};
use validation_shared::{
    config::{AppConfig, StoreBackend},
    database::Database,
    observability::{self, middleware as obs_middleware},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME)?;

    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!(
        environment = %config.environment,
        store = ?config.engine.store,
        "Starting {} on {}",
        config.service_name,
        config.server_addr()
    );

    let limits = EngineLimits {
        max_expression_length: config.engine.max_expression_length,
        max_depth: config.engine.max_depth,
    };

    let (store, database): (Arc<dyn RuleStore>, Option<Database>) = match config.engine.store {
        StoreBackend::Memory => {
            let store = InMemoryRuleStore::new();
            if config.engine.seed_demo_rules {
                for rule in seed::demo_rules() {
                    store.insert(rule);
                }
                info!(count = store.len(), "Demo rules loaded");
            }
            (Arc::new(store), None)
        }
        StoreBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            if config.database.run_migrations {
                db.run_migrations().await?;
            }
            if config.engine.seed_demo_rules {
                warn!("seed_demo_rules only applies to the memory store, ignored");
            }
            (Arc::new(PgRuleStore::new(db.pool().clone())), Some(db))
        }
    };

    let engine = RuleEngine::with_limits(store, limits);
    let state = match database.clone() {
        Some(db) => AppState::with_database(engine, db),
        None => AppState::new(engine),
    };

    let cors = cors_layer(&config);

    let app = routes::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_seconds,
        )))
        .layer(cors)
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");

    Ok(())
}

/// 按 `server.cors_origins` 构建跨域配置
fn cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed_origins = config.server.cors_origins.trim();

    if allowed_origins == "*" {
        if config.is_production() {
            warn!("cors_origins=\"*\" 在生产环境中不安全，请设置为具体域名");
        }
        info!("CORS allowed_origins: * (all origins)");
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        info!("CORS allowed_origins: {}", allowed_origins);
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// 监听关闭信号
///
/// 收到 SIGTERM 或 Ctrl+C 后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("注册 Ctrl+C 处理器失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("注册 SIGTERM 处理器失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
