//! 阈值评估器
//!
//! 成就评估：计数器值与类别内每条阈值独立比较，一次更新中跨越的所有阈值同时授予。
//! 徽章评估：累计积分与徽章阶梯比较，只授予比当前等级更高的最高一级。

use serde::Serialize;
use tracing::trace;

use crate::catalog::Catalog;
use crate::models::{AchievementDefinition, BadgeDefinition, BadgeRank, CounterKind, EarnedSet, UserCounters};

/// 成就评估结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AchievementOutcome {
    /// 新获得的成就（按类别、阈值升序）
    pub newly_earned: Vec<AchievementDefinition>,
    /// 新成就积分之和
    pub points: u64,
}

impl AchievementOutcome {
    pub fn is_empty(&self) -> bool {
        self.newly_earned.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.newly_earned.iter().map(|a| a.id.as_str()).collect()
    }

    fn push(&mut self, def: &AchievementDefinition) {
        self.points = self.points.saturating_add(def.points);
        self.newly_earned.push(def.clone());
    }

    fn merge(&mut self, other: AchievementOutcome) {
        self.points = self.points.saturating_add(other.points);
        self.newly_earned.extend(other.newly_earned);
    }
}

/// 成就评估器
pub struct AchievementEvaluator;

impl AchievementEvaluator {
    /// 评估单个计数器类别
    ///
    /// # Arguments
    /// * `kind` - 计数器类别
    /// * `value` - 计数器当前值，`None` 表示档案中缺失该计数器
    /// * `earned` - 已获得的成就 ID
    ///
    /// 计数器缺失或类别下没有定义时返回空结果。
    pub fn evaluate(
        catalog: &Catalog,
        kind: CounterKind,
        value: Option<u64>,
        earned: &EarnedSet,
    ) -> AchievementOutcome {
        let mut outcome = AchievementOutcome::default();

        let Some(value) = value else {
            return outcome;
        };

        for def in catalog.achievements_for(kind) {
            if def.is_met_by(value) && !earned.contains(&def.id) {
                trace!(achievement = %def.id, counter = %kind, value, "阈值已跨越");
                outcome.push(def);
            }
        }

        outcome
    }

    /// 评估档案中存在的全部计数器
    pub fn evaluate_all(
        catalog: &Catalog,
        counters: &UserCounters,
        earned: &EarnedSet,
    ) -> AchievementOutcome {
        let mut outcome = AchievementOutcome::default();
        for (kind, value) in counters.iter() {
            outcome.merge(Self::evaluate(catalog, kind, Some(value), earned));
        }
        outcome
    }
}

/// 徽章评估结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BadgeOutcome {
    /// 新跨越的最高等级徽章
    pub badge: Option<BadgeDefinition>,
    /// 同一次跳跃中被越过的较低等级徽章 ID，仅用于补记标记
    pub implied: Vec<String>,
}

impl BadgeOutcome {
    pub fn is_empty(&self) -> bool {
        self.badge.is_none()
    }

    /// 新徽章的奖励积分
    pub fn points(&self) -> u64 {
        self.badge.as_ref().map(|b| b.points).unwrap_or(0)
    }
}

/// 徽章评估器
pub struct BadgeEvaluator;

impl BadgeEvaluator {
    /// 用户当前等级：已获得徽章中的最高等级
    pub fn current_rank(catalog: &Catalog, earned: &EarnedSet) -> Option<BadgeRank> {
        catalog
            .badges()
            .iter()
            .filter(|b| earned.contains(&b.id))
            .map(|b| b.rank)
            .max()
    }

    /// 评估累计积分
    ///
    /// 只考虑高于当前等级且阈值不超过积分的徽章，其中最高一级作为结果，
    /// 其余作为 `implied` 返回。积分低于当前等级阈值时不会降级。
    pub fn evaluate(catalog: &Catalog, score: u64, earned: &EarnedSet) -> BadgeOutcome {
        let current = Self::current_rank(catalog, earned);

        let mut crossed: Vec<&BadgeDefinition> = catalog
            .badges()
            .iter()
            .filter(|b| current.is_none_or(|rank| b.rank > rank))
            .filter(|b| score >= b.threshold && !earned.contains(&b.id))
            .collect();

        let Some(top) = crossed.pop() else {
            return BadgeOutcome::default();
        };

        trace!(badge = %top.id, rank = %top.rank, score, "徽章等级提升");

        BadgeOutcome {
            badge: Some(top.clone()),
            implied: crossed.into_iter().map(|b| b.id.clone()).collect(),
        }
    }
}
