//! 活动事件处理器
//!
//! 实现 `EventProcessor` trait：把活动事件映射为计数器自增，全部生效后评估一次，
//! 并按 event_id 在 TTL 窗口内做幂等校验。

use std::sync::Arc;
use std::time::{Duration, Instant};

use achievement_engine::CounterKind;
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};
use urbindex_shared::error::UrbindexError;
use urbindex_shared::events::{
    Activity, ActivityEvent, ActivityType, CounterUpdate, EventProcessor, EventResult,
};
use urbindex_shared::observability::metrics;

use crate::error::{AchievementError, Result};
use crate::repository::ProfileRepository;
use crate::service::ScoringService;

/// 活动对应的计数器增量
pub fn counter_increments(activity: &Activity) -> Result<Vec<(CounterKind, u64)>> {
    let increments = match activity {
        Activity::LocationAdded { night: false } => vec![(CounterKind::Locations, 1)],
        Activity::LocationAdded { night: true } => vec![
            (CounterKind::Locations, 1),
            (CounterKind::NightLocations, 1),
        ],
        Activity::CommentPosted => vec![(CounterKind::Comments, 1)],
        Activity::TerritoryClaimed => vec![(CounterKind::Territories, 1)],
        Activity::GeocacheFound => vec![(CounterKind::GeocachesFound, 1)],
        Activity::ChallengeCompleted => vec![(CounterKind::ChallengesCompleted, 1)],
        Activity::PhotoUploaded => vec![(CounterKind::PhotosUploaded, 1)],
        Activity::VideoUploaded => vec![(CounterKind::VideosUploaded, 1)],
        Activity::BatchImport { counter, count } => {
            let kind = CounterKind::from_field_name(counter)
                .ok_or_else(|| AchievementError::UnknownCounter(counter.clone()))?;
            if *count == 0 {
                return Err(AchievementError::Validation(
                    "批量导入数量必须大于 0".to_string(),
                ));
            }
            vec![(kind, *count)]
        }
    };
    Ok(increments)
}

/// 重新投递时已经自增过的计数器
struct AppliedCounters {
    started: Instant,
    counters: Vec<CounterUpdate>,
}

impl AppliedCounters {
    fn value_of(&self, kind: CounterKind) -> Option<u64> {
        self.counters
            .iter()
            .find(|c| c.counter == kind.field_name())
            .map(|c| c.value)
    }
}

pub struct ActivityEventProcessor<R>
where
    R: ProfileRepository,
{
    scoring: Arc<ScoringService<R>>,
    /// event_id -> 处理完成时间
    processed: DashMap<String, Instant>,
    /// 处理失败事件中已经生效的计数器，重新投递时跳过
    applied: DashMap<String, AppliedCounters>,
    ttl: Duration,
}

impl<R> ActivityEventProcessor<R>
where
    R: ProfileRepository + 'static,
{
    pub fn new(scoring: Arc<ScoringService<R>>, ttl: Duration) -> Self {
        Self {
            scoring,
            processed: DashMap::new(),
            applied: DashMap::new(),
            ttl,
        }
    }

    /// 幂等校验后处理事件
    ///
    /// 只有无错误的事件才会被标记为已处理，失败的事件可以重新投递。
    pub async fn handle(
        &self,
        event: &ActivityEvent,
    ) -> std::result::Result<EventResult, UrbindexError> {
        if self.is_processed(&event.event_id).await? {
            metrics::record_activity_event(&event.activity_type().to_string(), "duplicate");
            return Ok(EventResult::duplicate(&event.event_id));
        }

        let result = self.process(event).await?;
        if result.errors.is_empty() {
            self.mark_processed(&event.event_id).await?;
        }
        Ok(result)
    }

    /// 清理超过 TTL 的幂等记录，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let before = self.tracked_events();
        let ttl = self.ttl;
        self.processed.retain(|_, at| at.elapsed() < ttl);
        self.applied.retain(|_, applied| applied.started.elapsed() < ttl);
        let purged = before.saturating_sub(self.tracked_events());
        if purged > 0 {
            debug!(purged, "已清理过期幂等记录");
        }
        purged
    }

    /// 当前保留的幂等记录数
    pub fn tracked_events(&self) -> usize {
        self.processed.len() + self.applied.len()
    }

    /// 逐个自增计数器，遇到错误立即停止
    ///
    /// 上次投递已生效的计数器直接复用记录的值，不再自增。
    async fn apply_increments(
        &self,
        event: &ActivityEvent,
        increments: &[(CounterKind, u64)],
        result: &mut EventResult,
    ) -> bool {
        for &(kind, delta) in increments {
            let previous = self
                .applied
                .get(&event.event_id)
                .and_then(|applied| applied.value_of(kind));
            if let Some(value) = previous {
                debug!(counter = %kind, value, "计数器已在上次投递中生效，跳过");
                result.counters.push(CounterUpdate {
                    counter: kind.field_name().to_string(),
                    value,
                });
                continue;
            }

            match self
                .scoring
                .increment_counter(&event.user_id, kind, delta)
                .await
            {
                Ok(value) => {
                    let update = CounterUpdate {
                        counter: kind.field_name().to_string(),
                        value,
                    };
                    self.applied
                        .entry(event.event_id.clone())
                        .or_insert_with(|| AppliedCounters {
                            started: Instant::now(),
                            counters: Vec::new(),
                        })
                        .counters
                        .push(update.clone());
                    result.counters.push(update);
                }
                Err(e) => {
                    warn!(counter = %kind, error = %e, code = e.error_code(), "计数器处理失败");
                    result.errors.push(e.to_string());
                    return false;
                }
            }
        }
        true
    }
}

#[async_trait]
impl<R> EventProcessor for ActivityEventProcessor<R>
where
    R: ProfileRepository + 'static,
{
    #[instrument(
        skip(self, event),
        fields(
            event_id = %event.event_id,
            user_id = %event.user_id,
            activity_type = %event.activity_type()
        )
    )]
    async fn process(&self, event: &ActivityEvent) -> std::result::Result<EventResult, UrbindexError> {
        let start = Instant::now();
        let activity_type = event.activity_type().to_string();

        let mut result = EventResult {
            event_id: event.event_id.clone(),
            ..Default::default()
        };

        match counter_increments(&event.activity) {
            Ok(increments) => {
                if self.apply_increments(event, &increments, &mut result).await {
                    match self.scoring.evaluate_user(&event.user_id).await {
                        Ok(outcome) => {
                            result.granted_achievements =
                                outcome.achievements.iter().map(|a| a.id.clone()).collect();
                            result.granted_badge = outcome.badge.map(|b| b.id);
                            result.points_awarded = outcome.points_awarded;
                        }
                        Err(e) => {
                            warn!(error = %e, code = e.error_code(), "计分评估失败");
                            result.errors.push(e.to_string());
                        }
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "活动事件无效");
                result.errors.push(e.to_string());
            }
        }

        if result.errors.is_empty() {
            self.applied.remove(&event.event_id);
        }
        result.processed = result.errors.is_empty();
        result.processing_time_ms = start.elapsed().as_millis() as i64;

        let status = if result.processed { "success" } else { "error" };
        metrics::record_activity_event(&activity_type, status);

        info!(
            processed = result.processed,
            achievements = ?result.granted_achievements,
            badge = ?result.granted_badge,
            points = result.points_awarded,
            processing_time_ms = result.processing_time_ms,
            "活动事件处理完成"
        );

        Ok(result)
    }

    fn supported_activity_types(&self) -> Vec<ActivityType> {
        vec![
            ActivityType::LocationAdded,
            ActivityType::CommentPosted,
            ActivityType::TerritoryClaimed,
            ActivityType::GeocacheFound,
            ActivityType::ChallengeCompleted,
            ActivityType::PhotoUploaded,
            ActivityType::VideoUploaded,
            ActivityType::BatchImport,
        ]
    }

    async fn is_processed(&self, event_id: &str) -> std::result::Result<bool, UrbindexError> {
        let fresh = self
            .processed
            .get(event_id)
            .is_some_and(|at| at.elapsed() < self.ttl);

        if fresh {
            debug!(event_id, "事件已处理，跳过");
        }
        Ok(fresh)
    }

    async fn mark_processed(&self, event_id: &str) -> std::result::Result<(), UrbindexError> {
        self.processed.insert(event_id.to_string(), Instant::now());
        debug!(event_id, "事件已标记为已处理");
        Ok(())
    }
}
