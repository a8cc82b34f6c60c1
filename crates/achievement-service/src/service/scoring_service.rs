//! 计分服务
//!
//! 连接档案仓储、计分引擎和通知：
//!
//! 1. 计数器自增（档案不存在时自动创建）
//! 2. 读取档案快照，运行单次计分评估
//! 3. 非空增量写回档案（只置位标记、只加积分）
//! 4. 为每个新成就和最高新徽章发送通知（失败只记日志）
//!
//! 同一用户多端并发时可能重复发放，目前不做处理。

use std::sync::Arc;
use std::time::Instant;

use achievement_engine::{
    BadgeEvaluator, CatalogHandle, CounterKind, EarnedSet, EvaluationOutcome, ScoreEvaluator,
};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use urbindex_shared::observability::metrics;

use crate::error::{AchievementError, Result};
use crate::notification::NotificationSender;
use crate::repository::ProfileRepository;
use crate::service::dto::{ActivityResult, UserScoreSummary};

pub struct ScoringService<R>
where
    R: ProfileRepository,
{
    repo: Arc<R>,
    catalog: CatalogHandle,
    /// 通知发送器（可选，延迟注入）
    notification_sender: RwLock<Option<Arc<NotificationSender>>>,
}

impl<R> ScoringService<R>
where
    R: ProfileRepository,
{
    pub fn new(repo: Arc<R>, catalog: CatalogHandle) -> Self {
        Self {
            repo,
            catalog,
            notification_sender: RwLock::new(None),
        }
    }

    pub async fn set_notification_sender(&self, sender: Arc<NotificationSender>) {
        let mut guard = self.notification_sender.write().await;
        *guard = Some(sender);
        info!("ScoringService 通知发送器已设置");
    }

    pub fn catalog(&self) -> &CatalogHandle {
        &self.catalog
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    /// 记录一次活动：计数器自增后立即评估
    #[instrument(skip(self))]
    pub async fn record_activity(
        &self,
        user_id: &str,
        kind: CounterKind,
        delta: u64,
    ) -> Result<ActivityResult> {
        let counter_value = self.increment_counter(user_id, kind, delta).await?;
        let outcome = self.evaluate_user(user_id).await?;

        Ok(ActivityResult {
            user_id: user_id.to_string(),
            counter: kind,
            counter_value,
            outcome,
        })
    }

    /// 只做计数器自增，不触发评估
    ///
    /// 一个事件涉及多个计数器时，先逐个自增，最后调用一次 `evaluate_user`。
    pub async fn increment_counter(
        &self,
        user_id: &str,
        kind: CounterKind,
        delta: u64,
    ) -> Result<u64> {
        if delta == 0 {
            return Err(AchievementError::Validation("delta 必须大于 0".to_string()));
        }

        let counter_value = self.repo.increment_counter(user_id, kind, delta).await?;
        debug!(counter = %kind, counter_value, "计数器已自增");
        Ok(counter_value)
    }

    /// 评估用户档案并写回新获得的奖励
    ///
    /// 档案不存在时返回空结果。
    #[instrument(skip(self))]
    pub async fn evaluate_user(&self, user_id: &str) -> Result<EvaluationOutcome> {
        let start = Instant::now();
        let result = self.evaluate_and_persist(user_id).await;

        let status = if result.is_ok() { "success" } else { "error" };
        metrics::record_score_evaluation(status, start.elapsed().as_secs_f64());

        result
    }

    async fn evaluate_and_persist(&self, user_id: &str) -> Result<EvaluationOutcome> {
        let Some(profile) = self.repo.get_profile(user_id).await? else {
            debug!("用户档案不存在，跳过评估");
            return Ok(EvaluationOutcome::default());
        };

        let catalog = self.catalog.load();
        let outcome = ScoreEvaluator::evaluate(&catalog, &profile.to_snapshot());

        let update = outcome.to_update();
        if update.is_empty() {
            return Ok(outcome);
        }

        self.repo.apply_rewards(user_id, &update).await?;

        for achievement in &outcome.achievements {
            metrics::record_achievement_granted(&achievement.id, achievement.category.field_name());
        }
        if let Some(badge) = &outcome.badge {
            metrics::record_badge_granted(&badge.id);
        }

        info!(
            achievements = ?update.achievements,
            badges = ?update.badges,
            points = outcome.points_awarded,
            new_score = outcome.new_score,
            "奖励已写回"
        );

        self.notify(user_id, &outcome).await;

        Ok(outcome)
    }

    /// 新成就逐个通知，徽章只通知最高等级
    async fn notify(&self, user_id: &str, outcome: &EvaluationOutcome) {
        let guard = self.notification_sender.read().await;
        let Some(sender) = guard.as_ref() else {
            return;
        };

        for achievement in &outcome.achievements {
            sender.send_achievement_unlocked(user_id, achievement).await;
        }
        if let Some(badge) = &outcome.badge {
            sender.send_badge_earned(user_id, badge).await;
        }
    }

    /// 用户计分概览
    #[instrument(skip(self))]
    pub async fn get_summary(&self, user_id: &str) -> Result<UserScoreSummary> {
        let profile = self
            .repo
            .get_profile(user_id)
            .await?
            .ok_or_else(|| AchievementError::ProfileNotFound(user_id.to_string()))?;

        let catalog = self.catalog.load();
        let earned_badges = EarnedSet::from_flags(&profile.badges);
        let current_rank = BadgeEvaluator::current_rank(&catalog, &earned_badges);

        let current_badge = current_rank
            .and_then(|rank| catalog.badges().iter().find(|b| b.rank == rank))
            .cloned();
        let next_badge = catalog
            .badges()
            .iter()
            .find(|b| current_rank.is_none_or(|rank| b.rank > rank))
            .cloned();
        let points_to_next_badge = next_badge
            .as_ref()
            .map(|b| b.threshold.saturating_sub(profile.score));

        let mut achievements: Vec<String> = EarnedSet::from_flags(&profile.achievements)
            .iter()
            .map(str::to_string)
            .collect();
        achievements.sort();

        Ok(UserScoreSummary {
            user_id: profile.user_id,
            score: profile.score,
            counters: profile.counters,
            achievements,
            current_badge,
            next_badge,
            points_to_next_badge,
        })
    }
}
