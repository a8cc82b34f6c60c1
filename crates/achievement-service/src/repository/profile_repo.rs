//! PostgreSQL 档案仓储
//!
//! 计数器和标记以 JSONB 保存，自增与奖励写回均为单条语句的原子更新。

use std::collections::HashMap;

use achievement_engine::{CounterKind, RewardUpdate, UserCounters};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, info, instrument};

use super::traits::ProfileRepository;
use crate::error::{AchievementError, Result};
use crate::models::UserProfile;

pub struct PgProfileRepository {
    pool: PgPool,
}

impl PgProfileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 执行内嵌的数据库迁移
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("用户档案表迁移完成");
        Ok(())
    }

    fn to_i64(field: &str, value: u64) -> Result<i64> {
        i64::try_from(value)
            .map_err(|_| AchievementError::Validation(format!("{field} 超出范围: {value}")))
    }

    fn to_u64(field: &str, value: i64) -> Result<u64> {
        u64::try_from(value)
            .map_err(|_| AchievementError::Internal(format!("{field} 为负数: {value}")))
    }

    /// 把 ID 列表转换成 `{"id": true}` 形式，用于 JSONB 合并
    fn flags_object(ids: &[String]) -> serde_json::Value {
        serde_json::Value::Object(
            ids.iter()
                .map(|id| (id.clone(), serde_json::Value::Bool(true)))
                .collect(),
        )
    }
}

#[async_trait]
impl ProfileRepository for PgProfileRepository {
    #[instrument(skip(self))]
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, counters, score, achievements, badges, created_at, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let counters: Json<UserCounters> = row.try_get("counters")?;
        let achievements: Json<HashMap<String, bool>> = row.try_get("achievements")?;
        let badges: Json<HashMap<String, bool>> = row.try_get("badges")?;
        let score: i64 = row.try_get("score")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Some(UserProfile {
            user_id: row.try_get("user_id")?,
            counters: counters.0,
            score: Self::to_u64("score", score)?,
            achievements: achievements.0,
            badges: badges.0,
            created_at,
            updated_at,
        }))
    }

    #[instrument(skip(self))]
    async fn increment_counter(
        &self,
        user_id: &str,
        kind: CounterKind,
        delta: u64,
    ) -> Result<u64> {
        let delta = Self::to_i64("delta", delta)?;

        let value: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO user_profiles (user_id, counters)
            VALUES ($1, jsonb_build_object($2::text, $3::bigint))
            ON CONFLICT (user_id) DO UPDATE SET
                counters = jsonb_set(
                    user_profiles.counters,
                    ARRAY[$2::text],
                    to_jsonb(COALESCE((user_profiles.counters ->> $2::text)::bigint, 0) + $3::bigint)
                ),
                updated_at = NOW()
            RETURNING (counters ->> $2::text)::bigint
            "#,
        )
        .bind(user_id)
        .bind(kind.field_name())
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;

        debug!(counter = %kind, value, "计数器已更新");
        Self::to_u64(kind.field_name(), value)
    }

    #[instrument(skip(self, update), fields(points = update.points))]
    async fn apply_rewards(&self, user_id: &str, update: &RewardUpdate) -> Result<()> {
        let points = Self::to_i64("points", update.points)?;

        let result = sqlx::query(
            r#"
            UPDATE user_profiles
            SET achievements = achievements || $2::jsonb,
                badges = badges || $3::jsonb,
                score = score + $4,
                updated_at = NOW()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(Json(Self::flags_object(&update.achievements)))
        .bind(Json(Self::flags_object(&update.badges)))
        .bind(points)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AchievementError::ProfileNotFound(user_id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_profiles
                (user_id, counters, score, achievements, badges, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                counters = EXCLUDED.counters,
                score = EXCLUDED.score,
                achievements = EXCLUDED.achievements,
                badges = EXCLUDED.badges,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(Json(&profile.counters))
        .bind(Self::to_i64("score", profile.score)?)
        .bind(Json(&profile.achievements))
        .bind(Json(&profile.badges))
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
