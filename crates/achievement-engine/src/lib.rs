//! 成就计分引擎
//!
//! 提供纯计算的成就/徽章评估能力，支持：
//! - 成就与徽章定义（内置 Urbindex 规则表，或从 JSON 加载）
//! - 规则表校验与原子热替换
//! - 基于计数器阈值的成就评估（支持跨越多个阈值）
//! - 基于累计积分的徽章等级评估（只升不降）
//!
//! 引擎不做任何 IO，持久化与通知由调用方负责。

pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod scoring;

pub use catalog::{Catalog, CatalogHandle};
pub use error::{CatalogError, Result};
pub use evaluator::{AchievementEvaluator, AchievementOutcome, BadgeEvaluator, BadgeOutcome};
pub use models::{
    AchievementDefinition, BadgeDefinition, BadgeRank, CounterKind, EarnedSet, UserCounters,
};
pub use scoring::{EvaluationOutcome, RewardUpdate, ScoreEvaluator, ScoreSnapshot};
