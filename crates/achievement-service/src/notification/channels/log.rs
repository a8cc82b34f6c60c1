//! 日志渠道

use std::time::Instant;

use async_trait::async_trait;
use tracing::info;

use super::NotificationChannel;
use crate::error::Result;
use crate::notification::types::{ChannelResult, Notification};

#[derive(Debug, Default, Clone)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, notification: &Notification) -> Result<ChannelResult> {
        let start = Instant::now();
        info!(
            notification_id = %notification.notification_id,
            user_id = %notification.user_id,
            notification_type = ?notification.notification_type,
            title = %notification.title,
            body = %notification.body,
            "用户通知"
        );
        Ok(ChannelResult::success(
            self.name(),
            start.elapsed().as_millis() as u64,
        ))
    }
}
