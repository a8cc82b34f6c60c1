//! 用户档案模型

use std::collections::HashMap;

use achievement_engine::{CounterKind, RewardUpdate, ScoreSnapshot, UserCounters};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 用户档案
///
/// 计数器由活动写入；成就/徽章以布尔标记保存，标记一旦为 true 不会回退。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub counters: UserCounters,
    #[serde(default)]
    pub score: u64,
    #[serde(default)]
    pub achievements: HashMap<String, bool>,
    #[serde(default)]
    pub badges: HashMap<String, bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            counters: UserCounters::new(),
            score: 0,
            achievements: HashMap::new(),
            badges: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_counter(mut self, kind: CounterKind, value: u64) -> Self {
        self.counters.set(kind, value);
        self
    }

    pub fn with_score(mut self, score: u64) -> Self {
        self.score = score;
        self
    }

    pub fn with_achievement(mut self, id: impl Into<String>) -> Self {
        self.achievements.insert(id.into(), true);
        self
    }

    pub fn with_badge(mut self, id: impl Into<String>) -> Self {
        self.badges.insert(id.into(), true);
        self
    }

    /// 评估用快照
    pub fn to_snapshot(&self) -> ScoreSnapshot {
        ScoreSnapshot::new(
            self.counters.clone(),
            self.score,
            &self.achievements,
            &self.badges,
        )
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.get(id).copied().unwrap_or(false)
    }

    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.get(id).copied().unwrap_or(false)
    }

    /// 应用奖励增量：只置位标记、只加积分
    pub fn apply_rewards(&mut self, update: &RewardUpdate) {
        for id in &update.achievements {
            self.achievements.insert(id.clone(), true);
        }
        for id in &update.badges {
            self.badges.insert(id.clone(), true);
        }
        self.score = self.score.saturating_add(update.points);
        self.updated_at = Utc::now();
    }
}
