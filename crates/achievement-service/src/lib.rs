//! 成就计分服务
//!
//! 消费用户活动事件，更新档案计数器，评估成就与徽章并写回档案，
//! 随后向用户发送成就解锁/徽章晋级通知。

pub mod consumer;
pub mod error;
pub mod models;
pub mod notification;
pub mod processor;
pub mod repository;
pub mod service;

pub use error::{AchievementError, Result};
