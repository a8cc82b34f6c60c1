//! 共享库
//!
//! 包含计分服务共用的配置、错误处理、数据库连接、可观测性与活动事件模型等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod events;
pub mod observability;
