//! 数据传输对象
//!
//! 请求与响应字段统一使用 snake_case。

pub mod request;
pub mod response;

pub use request::*;
pub use response::*;
