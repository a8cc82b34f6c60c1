//! 通知服务
//!
//! 把一条通知并行发送到所有已注册渠道，单渠道失败不影响其他渠道。

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tracing::{error, info, instrument, warn};

use super::channels::{LogChannel, NotificationChannel};
use super::types::{ChannelResult, Notification, NotificationResult};
use crate::error::Result;

#[derive(Default)]
pub struct NotificationService {
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl NotificationService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只包含日志渠道
    pub fn with_defaults() -> Self {
        let mut service = Self::new();
        service.register_channel(Arc::new(LogChannel::new()));
        service
    }

    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(channel_name = channel.name(), "注册通知渠道");
        self.channels.push(channel);
    }

    #[instrument(
        skip(self, notification),
        fields(
            notification_id = %notification.notification_id,
            user_id = %notification.user_id,
            notification_type = ?notification.notification_type
        )
    )]
    pub async fn send(&self, notification: Notification) -> Result<NotificationResult> {
        let start = Instant::now();

        if self.channels.is_empty() {
            warn!("没有已注册的通知渠道");
        }

        let results = join_all(self.channels.iter().map(|channel| {
            let notification = &notification;
            async move { (channel.name().to_string(), channel.send(notification).await) }
        }))
        .await;

        let channel_results: Vec<ChannelResult> = results
            .into_iter()
            .map(|(name, result)| match result {
                Ok(r) => r,
                Err(e) => {
                    error!(channel = %name, error = %e, "渠道发送异常");
                    ChannelResult::failed(name, e.to_string(), 0)
                }
            })
            .collect();

        let result = NotificationResult::new(
            notification.notification_id.clone(),
            channel_results,
            start.elapsed().as_millis() as u64,
        );
        self.log_result(&result);

        Ok(result)
    }

    fn log_result(&self, result: &NotificationResult) {
        let total = result.channel_results.len();
        if result.success {
            info!(total, duration_ms = result.duration_ms, "通知发送完成");
        } else if result.is_partial_success() {
            warn!(
                success_count = result.success_count(),
                failure_count = result.failure_count(),
                total,
                "通知部分发送成功"
            );
        } else {
            error!(failure_count = result.failure_count(), total, "通知发送失败");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AchievementError;
    use crate::notification::channels::QueueChannel;
    use crate::notification::types::NotificationType;
    use async_trait::async_trait;

    struct BrokenChannel;

    #[async_trait]
    impl NotificationChannel for BrokenChannel {
        fn name(&self) -> &str {
            "broken"
        }

        async fn send(&self, _notification: &Notification) -> Result<ChannelResult> {
            Err(AchievementError::ChannelFailed {
                channel: "broken".to_string(),
                message: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_one_failing_channel_does_not_block_others() {
        let (queue, mut rx) = QueueChannel::new(8);
        let mut service = NotificationService::with_defaults();
        service.register_channel(Arc::new(BrokenChannel));
        service.register_channel(Arc::new(queue));

        let notification =
            Notification::new("user-1", NotificationType::BadgeEarned, "title", "body");
        let result = service.send(notification).await.unwrap();

        assert!(result.is_partial_success());
        assert_eq!(result.success_count(), 2);
        assert_eq!(rx.recv().await.unwrap().title, "title");
    }

    #[tokio::test]
    async fn test_no_channels_still_reports_success() {
        let service = NotificationService::new();
        let result = service
            .send(Notification::new("u1", NotificationType::AchievementUnlocked, "a", "b"))
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.channel_results.is_empty());
    }
}
