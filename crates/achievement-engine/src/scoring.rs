//! 单次计分评估
//!
//! 组合成就评估与徽章评估：先计算新成就及其积分，再用累加后的积分评估徽章阶梯。
//! 徽章奖励积分计入最终积分，但不在同一轮中再次参与徽章评估。

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::evaluator::{AchievementEvaluator, BadgeEvaluator};
use crate::models::{AchievementDefinition, BadgeDefinition, EarnedSet, UserCounters};

/// 评估输入：某个用户档案的快照
#[derive(Debug, Clone, Default)]
pub struct ScoreSnapshot {
    pub counters: UserCounters,
    pub score: u64,
    pub achievements: EarnedSet,
    pub badges: EarnedSet,
}

impl ScoreSnapshot {
    pub fn new(
        counters: UserCounters,
        score: u64,
        achievement_flags: &HashMap<String, bool>,
        badge_flags: &HashMap<String, bool>,
    ) -> Self {
        Self {
            counters,
            score,
            achievements: EarnedSet::from_flags(achievement_flags),
            badges: EarnedSet::from_flags(badge_flags),
        }
    }
}

/// 需要写回档案的增量
///
/// 只会把标记置为 true 并增加积分，不包含任何撤销操作。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardUpdate {
    pub achievements: Vec<String>,
    pub badges: Vec<String>,
    pub points: u64,
}

impl RewardUpdate {
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.badges.is_empty() && self.points == 0
    }
}

/// 单次评估结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvaluationOutcome {
    /// 新获得的成就
    pub achievements: Vec<AchievementDefinition>,
    /// 新获得的最高等级徽章（用于通知）
    pub badge: Option<BadgeDefinition>,
    /// 被越过的较低等级徽章 ID（只补记标记，不通知、不加分）
    pub implied_badges: Vec<String>,
    /// 本次新增积分（成就积分 + 徽章奖励积分）
    pub points_awarded: u64,
    pub previous_score: u64,
    pub new_score: u64,
}

impl EvaluationOutcome {
    pub fn is_empty(&self) -> bool {
        self.achievements.is_empty() && self.badge.is_none()
    }

    /// 转换为写回档案的增量
    pub fn to_update(&self) -> RewardUpdate {
        let mut badges: Vec<String> = self.implied_badges.clone();
        if let Some(badge) = &self.badge {
            badges.push(badge.id.clone());
        }

        RewardUpdate {
            achievements: self.achievements.iter().map(|a| a.id.clone()).collect(),
            badges,
            points: self.points_awarded,
        }
    }
}

/// 计分评估器
pub struct ScoreEvaluator;

impl ScoreEvaluator {
    pub fn evaluate(catalog: &Catalog, snapshot: &ScoreSnapshot) -> EvaluationOutcome {
        let achievements =
            AchievementEvaluator::evaluate_all(catalog, &snapshot.counters, &snapshot.achievements);

        let score_after_achievements = snapshot.score.saturating_add(achievements.points);
        let badge = BadgeEvaluator::evaluate(catalog, score_after_achievements, &snapshot.badges);

        let points_awarded = achievements.points.saturating_add(badge.points());

        EvaluationOutcome {
            achievements: achievements.newly_earned,
            implied_badges: badge.implied,
            badge: badge.badge,
            points_awarded,
            previous_score: snapshot.score,
            new_score: snapshot.score.saturating_add(points_awarded),
        }
    }
}
