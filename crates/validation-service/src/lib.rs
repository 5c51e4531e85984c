//! 校验规则服务
//!
//! 通过 REST API 对外提供表单校验与规则管理。
//!
//! ## 核心功能
//!
//! - **表单校验**：按对象类型执行全部启用规则，返回被触发规则的错误消息
//! - **规则管理**：规则的增删改查，保存前编译表达式
//! - **表达式试运行**：不落库地执行单个表达式
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `repository`: PostgreSQL 规则存储
//! - `routes`: 路由配置
//! - `state`: 应用状态

pub mod dto;
pub mod error;
pub mod handlers;
pub mod repository;
pub mod routes;
pub mod state;

pub use error::{ApiError, Result};
pub use repository::PgRuleStore;
pub use state::AppState;
