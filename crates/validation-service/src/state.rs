//! 应用状态定义

use rule_engine::RuleEngine;
use validation_shared::database::Database;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    /// 规则引擎，内部持有规则存储与编译缓存
    pub engine: RuleEngine,
    /// 使用 PostgreSQL 存储时的连接池，供就绪探针检查
    pub database: Option<Database>,
}

impl AppState {
    pub fn new(engine: RuleEngine) -> Self {
        Self {
            engine,
            database: None,
        }
    }

    pub fn with_database(engine: RuleEngine, database: Database) -> Self {
        Self {
            engine,
            database: Some(database),
        }
    }
}
