//! 通知类型定义

use std::collections::HashMap;

use achievement_engine::{AchievementDefinition, BadgeDefinition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    AchievementUnlocked,
    BadgeEarned,
}

/// 通知
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub notification_id: String,
    pub user_id: String,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    /// 通知携带的业务数据
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            notification_id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            notification_type,
            title: title.into(),
            body: body.into(),
            data: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// 通知构建器
pub struct NotificationBuilder;

impl NotificationBuilder {
    /// 成就解锁通知
    pub fn achievement_unlocked(
        user_id: impl Into<String>,
        achievement: &AchievementDefinition,
    ) -> Notification {
        Notification::new(
            user_id,
            NotificationType::AchievementUnlocked,
            "成就解锁！",
            format!(
                "你解锁了「{}」成就，获得 {} 积分",
                achievement.name, achievement.points
            ),
        )
        .with_data("achievementId", serde_json::json!(achievement.id))
        .with_data("category", serde_json::json!(achievement.category))
        .with_data("points", serde_json::json!(achievement.points))
        .with_data("icon", serde_json::json!(achievement.icon))
    }

    /// 徽章晋级通知
    pub fn badge_earned(user_id: impl Into<String>, badge: &BadgeDefinition) -> Notification {
        Notification::new(
            user_id,
            NotificationType::BadgeEarned,
            "徽章晋级！",
            format!("你获得了「{}」徽章", badge.name),
        )
        .with_data("badgeId", serde_json::json!(badge.id))
        .with_data("rank", serde_json::json!(badge.rank))
        .with_data("points", serde_json::json!(badge.points))
        .with_data("icon", serde_json::json!(badge.icon))
    }
}

/// 单个渠道的发送结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelResult {
    pub channel: String,
    pub success: bool,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ChannelResult {
    pub fn success(channel: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            channel: channel.into(),
            success: true,
            error: None,
            duration_ms,
        }
    }

    pub fn failed(channel: impl Into<String>, error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            channel: channel.into(),
            success: false,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// 一条通知在所有渠道上的发送结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResult {
    pub notification_id: String,
    pub success: bool,
    pub channel_results: Vec<ChannelResult>,
    pub duration_ms: u64,
}

impl NotificationResult {
    pub fn new(notification_id: String, channel_results: Vec<ChannelResult>, duration_ms: u64) -> Self {
        let success = channel_results.iter().all(|r| r.success);
        Self {
            notification_id,
            success,
            channel_results,
            duration_ms,
        }
    }

    pub fn success_count(&self) -> usize {
        self.channel_results.iter().filter(|r| r.success).count()
    }

    pub fn failure_count(&self) -> usize {
        self.channel_results.len() - self.success_count()
    }

    pub fn is_partial_success(&self) -> bool {
        let success_count = self.success_count();
        success_count > 0 && success_count < self.channel_results.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use achievement_engine::{BadgeRank, CounterKind};

    #[test]
    fn test_achievement_unlocked() {
        let def = AchievementDefinition::new("explorer", "Explorer", CounterKind::Locations, 1, 10);
        let notification = NotificationBuilder::achievement_unlocked("user-1", &def);

        assert_eq!(notification.notification_type, NotificationType::AchievementUnlocked);
        assert!(notification.body.contains("Explorer"));
        assert_eq!(notification.data["achievementId"], "explorer");
        assert_eq!(notification.data["category"], "locationsCount");
        assert_eq!(notification.data["points"], 10);
    }

    #[test]
    fn test_badge_earned() {
        let def = BadgeDefinition::new("advanced", "Advanced", BadgeRank::Advanced, 400, 25);
        let notification = NotificationBuilder::badge_earned("user-1", &def);

        assert_eq!(notification.notification_type, NotificationType::BadgeEarned);
        assert_eq!(notification.data["rank"], "advanced");
    }

    #[test]
    fn test_notification_result_counts() {
        let result = NotificationResult::new(
            "n-1".to_string(),
            vec![
                ChannelResult::success("log", 1),
                ChannelResult::failed("queue", "closed", 0),
            ],
            1,
        );
        assert!(!result.success);
        assert!(result.is_partial_success());
        assert_eq!(result.failure_count(), 1);
    }
}
