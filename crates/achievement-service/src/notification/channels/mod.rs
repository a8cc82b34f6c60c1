//! 通知渠道实现
//!
//! - **Log**: 结构化日志输出
//! - **Queue**: 写入 tokio mpsc 队列，供界面层消费

mod log;
mod queue;

pub use log::LogChannel;
pub use queue::QueueChannel;

use async_trait::async_trait;

use super::types::{ChannelResult, Notification};
use crate::error::Result;

/// 通知渠道 trait
///
/// 发送失败应返回 `ChannelResult::failed` 而非 Err，Err 只用于渠道自身异常。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志和结果）
    fn name(&self) -> &str;

    async fn send(&self, notification: &Notification) -> Result<ChannelResult>;
}
