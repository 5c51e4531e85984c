//! 共享库
//!
//! 包含各服务共用的配置、数据库连接与可观测性基础设施代码。

pub mod config;
pub mod database;
pub mod observability;
