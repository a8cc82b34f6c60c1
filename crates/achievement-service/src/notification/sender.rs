//! 通知发送器
//!
//! 业务服务通过它发送成就/徽章通知。异步模式下在后台任务中发送，
//! 发送失败只记录日志，不影响计分流程。退出前调用 `shutdown`
//! 等待尚未完成的后台发送。

use std::sync::Arc;

use achievement_engine::{AchievementDefinition, BadgeDefinition};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::service::NotificationService;
use super::types::{Notification, NotificationBuilder};

pub struct NotificationSender {
    service: Arc<NotificationService>,
    async_enabled: bool,
    /// 异步模式下尚未完成的发送任务
    pending: Mutex<JoinSet<()>>,
}

impl NotificationSender {
    pub fn new(service: Arc<NotificationService>, async_enabled: bool) -> Self {
        Self {
            service,
            async_enabled,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    pub async fn send_achievement_unlocked(&self, user_id: &str, achievement: &AchievementDefinition) {
        self.send(NotificationBuilder::achievement_unlocked(user_id, achievement))
            .await;
    }

    pub async fn send_badge_earned(&self, user_id: &str, badge: &BadgeDefinition) {
        self.send(NotificationBuilder::badge_earned(user_id, badge))
            .await;
    }

    /// 异步模式下立即返回，同步模式下等待所有渠道完成
    pub async fn send(&self, notification: Notification) {
        if self.async_enabled {
            let service = self.service.clone();
            let mut pending = self.pending.lock().await;
            // 回收已完成的任务
            while pending.try_join_next().is_some() {}
            pending.spawn(async move {
                Self::deliver(&service, notification).await;
            });
        } else {
            Self::deliver(&self.service, notification).await;
        }
    }

    /// 等待所有后台发送完成，返回等待的任务数
    pub async fn shutdown(&self) -> usize {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        if pending.is_empty() {
            return 0;
        }

        info!(pending = pending.len(), "等待未完成的通知发送");
        let mut drained = 0;
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "通知发送任务异常退出");
            }
            drained += 1;
        }
        debug!(drained, "通知发送已全部完成");
        drained
    }

    async fn deliver(service: &NotificationService, notification: Notification) {
        let notification_id = notification.notification_id.clone();
        let user_id = notification.user_id.clone();

        match service.send(notification).await {
            Ok(result) if !result.success => {
                warn!(
                    notification_id = %notification_id,
                    user_id = %user_id,
                    failure_count = result.failure_count(),
                    "通知未能送达所有渠道"
                );
            }
            Ok(_) => {}
            Err(e) => {
                error!(
                    notification_id = %notification_id,
                    user_id = %user_id,
                    error = %e,
                    "通知发送异常"
                );
            }
        }
    }
}
