//! 活动事件模型与处理管道抽象
//!
//! 定义进入计分系统的活动事件信封、活动类型、处理结果，
//! 以及 `EventProcessor` trait 作为事件处理管道的核心抽象。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UrbindexError;

// ---------------------------------------------------------------------------
// ActivityType / Activity: 活动类型
// ---------------------------------------------------------------------------

/// 活动类型（不含负载），用于路由与指标标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    LocationAdded,
    CommentPosted,
    TerritoryClaimed,
    GeocacheFound,
    ChallengeCompleted,
    PhotoUploaded,
    VideoUploaded,
    BatchImport,
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::LocationAdded => "LOCATION_ADDED",
            Self::CommentPosted => "COMMENT_POSTED",
            Self::TerritoryClaimed => "TERRITORY_CLAIMED",
            Self::GeocacheFound => "GEOCACHE_FOUND",
            Self::ChallengeCompleted => "CHALLENGE_COMPLETED",
            Self::PhotoUploaded => "PHOTO_UPLOADED",
            Self::VideoUploaded => "VIDEO_UPLOADED",
            Self::BatchImport => "BATCH_IMPORT",
        };
        write!(f, "{s}")
    }
}

/// 用户活动
///
/// 每种活动对应一个或多个计数器自增。`BatchImport` 用于历史数据导入，
/// `counter` 为档案字段名（如 `locationsCount`）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Activity {
    LocationAdded {
        /// 夜间记录的地点同时计入夜探计数
        #[serde(default)]
        night: bool,
    },
    CommentPosted,
    TerritoryClaimed,
    GeocacheFound,
    ChallengeCompleted,
    PhotoUploaded,
    VideoUploaded,
    BatchImport { counter: String, count: u64 },
}

impl Activity {
    pub fn activity_type(&self) -> ActivityType {
        match self {
            Self::LocationAdded { .. } => ActivityType::LocationAdded,
            Self::CommentPosted => ActivityType::CommentPosted,
            Self::TerritoryClaimed => ActivityType::TerritoryClaimed,
            Self::GeocacheFound => ActivityType::GeocacheFound,
            Self::ChallengeCompleted => ActivityType::ChallengeCompleted,
            Self::PhotoUploaded => ActivityType::PhotoUploaded,
            Self::VideoUploaded => ActivityType::VideoUploaded,
            Self::BatchImport { .. } => ActivityType::BatchImport,
        }
    }
}

// ---------------------------------------------------------------------------
// ActivityEvent: 事件信封
// ---------------------------------------------------------------------------

/// 活动事件信封
///
/// 通过 `event_id`（UUID v7）实现幂等性校验。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    pub event_id: String,
    pub user_id: String,
    pub activity: Activity,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// 事件来源（web、import 等）
    #[serde(default)]
    pub source: String,
}

impl ActivityEvent {
    /// 构建新事件，自动生成 UUID v7 作为 event_id 并记录当前时间
    pub fn new(user_id: impl Into<String>, activity: Activity, source: impl Into<String>) -> Self {
        Self {
            event_id: Uuid::now_v7().to_string(),
            user_id: user_id.into(),
            activity,
            timestamp: Utc::now(),
            source: source.into(),
        }
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity.activity_type()
    }
}

// ---------------------------------------------------------------------------
// EventResult: 事件处理结果
// ---------------------------------------------------------------------------

/// 事件处理结果
///
/// `errors` 收集处理过程中的错误而非立即失败，调用方记录日志即可。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResult {
    pub event_id: String,
    pub processed: bool,
    /// 重复投递被幂等拦截
    pub duplicate: bool,
    /// 更新后的计数器值
    pub counters: Vec<CounterUpdate>,
    pub granted_achievements: Vec<String>,
    pub granted_badge: Option<String>,
    pub points_awarded: u64,
    pub processing_time_ms: i64,
    pub errors: Vec<String>,
}

impl EventResult {
    pub fn duplicate(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            processed: false,
            duplicate: true,
            ..Default::default()
        }
    }
}

/// 单个计数器更新
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterUpdate {
    pub counter: String,
    pub value: u64,
}

// ---------------------------------------------------------------------------
// EventProcessor trait: 事件处理管道抽象
// ---------------------------------------------------------------------------

/// 事件处理管道的核心抽象
///
/// - `process` 负责完整处理流程（计数器自增 -> 计分评估 -> 结果记录）
/// - `supported_activity_types` 用于路由
/// - `is_processed` / `mark_processed` 配合实现幂等性，防止重复投递导致计数器重复累加
#[async_trait]
pub trait EventProcessor: Send + Sync {
    async fn process(&self, event: &ActivityEvent) -> Result<EventResult, UrbindexError>;

    fn supported_activity_types(&self) -> Vec<ActivityType>;

    async fn is_processed(&self, event_id: &str) -> Result<bool, UrbindexError>;

    async fn mark_processed(&self, event_id: &str) -> Result<(), UrbindexError>;
}
