//! 队列渠道
//!
//! 通知写入有界 mpsc 队列。队列已满或接收端已关闭时返回失败结果，不阻塞发送方。

use async_trait::async_trait;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::NotificationChannel;
use crate::error::Result;
use crate::notification::types::{ChannelResult, Notification};

#[derive(Debug, Clone)]
pub struct QueueChannel {
    tx: mpsc::Sender<Notification>,
}

impl QueueChannel {
    /// 创建渠道及其接收端
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationChannel for QueueChannel {
    fn name(&self) -> &str {
        "queue"
    }

    async fn send(&self, notification: &Notification) -> Result<ChannelResult> {
        match self.tx.try_send(notification.clone()) {
            Ok(()) => Ok(ChannelResult::success(self.name(), 0)),
            Err(TrySendError::Full(_)) => Ok(ChannelResult::failed(self.name(), "队列已满", 0)),
            Err(TrySendError::Closed(_)) => {
                Ok(ChannelResult::failed(self.name(), "接收端已关闭", 0))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::types::NotificationType;

    fn notification() -> Notification {
        Notification::new("user-1", NotificationType::AchievementUnlocked, "t", "b")
    }

    #[tokio::test]
    async fn test_queue_delivers() {
        let (channel, mut rx) = QueueChannel::new(4);
        let result = channel.send(&notification()).await.unwrap();
        assert!(result.success);
        assert_eq!(rx.recv().await.unwrap().user_id, "user-1");
    }

    #[tokio::test]
    async fn test_queue_full_and_closed() {
        let (channel, rx) = QueueChannel::new(1);
        assert!(channel.send(&notification()).await.unwrap().success);

        let full = channel.send(&notification()).await.unwrap();
        assert!(!full.success);

        drop(rx);
        let closed = channel.send(&notification()).await.unwrap();
        assert_eq!(closed.error.as_deref(), Some("接收端已关闭"));
    }
}
