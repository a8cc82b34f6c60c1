//! 内存档案仓储
//!
//! 基于 DashMap 的进程内实现，用于开发环境和测试。

use achievement_engine::{CounterKind, RewardUpdate};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::traits::ProfileRepository;
use crate::error::{AchievementError, Result};
use crate::models::UserProfile;

#[derive(Default)]
pub struct MemoryProfileRepository {
    profiles: DashMap<String, UserProfile>,
}

impl MemoryProfileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileRepository for MemoryProfileRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        Ok(self.profiles.get(user_id).map(|p| p.value().clone()))
    }

    async fn increment_counter(
        &self,
        user_id: &str,
        kind: CounterKind,
        delta: u64,
    ) -> Result<u64> {
        let mut entry = self
            .profiles
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile::new(user_id));
        let value = entry.counters.increment(kind, delta);
        entry.updated_at = Utc::now();
        Ok(value)
    }

    async fn apply_rewards(&self, user_id: &str, update: &RewardUpdate) -> Result<()> {
        let mut profile = self
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| AchievementError::ProfileNotFound(user_id.to_string()))?;
        profile.apply_rewards(update);
        Ok(())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.profiles
            .insert(profile.user_id.clone(), profile.clone());
        Ok(())
    }
}
