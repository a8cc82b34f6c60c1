//! 计分服务数据传输对象

use achievement_engine::{BadgeDefinition, CounterKind, EvaluationOutcome, UserCounters};
use serde::Serialize;

/// 记录一次活动后的结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityResult {
    pub user_id: String,
    pub counter: CounterKind,
    /// 自增后的计数器值
    pub counter_value: u64,
    pub outcome: EvaluationOutcome,
}

impl ActivityResult {
    pub fn granted_achievement_ids(&self) -> Vec<String> {
        self.outcome
            .achievements
            .iter()
            .map(|a| a.id.clone())
            .collect()
    }
}

/// 用户计分概览
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserScoreSummary {
    pub user_id: String,
    pub score: u64,
    pub counters: UserCounters,
    /// 已获得的成就 ID（按 ID 排序）
    pub achievements: Vec<String>,
    pub current_badge: Option<BadgeDefinition>,
    pub next_badge: Option<BadgeDefinition>,
    /// 距下一徽章还差的积分，已到顶时为 None
    pub points_to_next_badge: Option<u64>,
}
