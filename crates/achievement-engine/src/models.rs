//! 计分引擎领域模型

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

/// 计数器类型
///
/// 每种计数器对应用户档案中的一个整数字段，成就按计数器归类。
/// serde 名称与档案文档字段名保持一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CounterKind {
    #[serde(rename = "locationsCount")]
    Locations,
    #[serde(rename = "commentsCount")]
    Comments,
    #[serde(rename = "territoriesCount")]
    Territories,
    #[serde(rename = "geocachesFound")]
    GeocachesFound,
    #[serde(rename = "challengesCompleted")]
    ChallengesCompleted,
    #[serde(rename = "photosUploaded")]
    PhotosUploaded,
    #[serde(rename = "videosUploaded")]
    VideosUploaded,
    #[serde(rename = "nightLocationsCount")]
    NightLocations,
}

impl CounterKind {
    pub const ALL: [CounterKind; 8] = [
        Self::Locations,
        Self::Comments,
        Self::Territories,
        Self::GeocachesFound,
        Self::ChallengesCompleted,
        Self::PhotosUploaded,
        Self::VideosUploaded,
        Self::NightLocations,
    ];

    /// 档案文档中的字段名
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Locations => "locationsCount",
            Self::Comments => "commentsCount",
            Self::Territories => "territoriesCount",
            Self::GeocachesFound => "geocachesFound",
            Self::ChallengesCompleted => "challengesCompleted",
            Self::PhotosUploaded => "photosUploaded",
            Self::VideosUploaded => "videosUploaded",
            Self::NightLocations => "nightLocationsCount",
        }
    }

    /// 按字段名查找计数器类型
    pub fn from_field_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.field_name() == name)
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.field_name())
    }
}

/// 成就定义
///
/// 加载后不可变。`category` 即成就所依赖的计数器。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub category: CounterKind,
    pub threshold: u64,
    pub points: u64,
}

impl AchievementDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: CounterKind,
        threshold: u64,
        points: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            category,
            threshold,
            points,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// 计数器值是否已达到阈值
    pub fn is_met_by(&self, value: u64) -> bool {
        value >= self.threshold
    }
}

/// 徽章等级（严格有序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeRank {
    Novice,
    Intermediate,
    Advanced,
    Expert,
    Master,
}

impl fmt::Display for BadgeRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Novice => "novice",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
            Self::Expert => "expert",
            Self::Master => "master",
        };
        write!(f, "{}", s)
    }
}

/// 徽章定义
///
/// 与成就结构相同，但阈值针对累计积分。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub rank: BadgeRank,
    pub threshold: u64,
    pub points: u64,
}

impl BadgeDefinition {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        rank: BadgeRank,
        threshold: u64,
        points: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            icon: String::new(),
            rank,
            threshold,
            points,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }
}

/// 用户计数器快照
///
/// 缺失的计数器与 0 不同：缺失时该类别评估为空操作。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserCounters(BTreeMap<CounterKind, u64>);

impl UserCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: CounterKind) -> Option<u64> {
        self.0.get(&kind).copied()
    }

    pub fn set(&mut self, kind: CounterKind, value: u64) {
        self.0.insert(kind, value);
    }

    pub fn with(mut self, kind: CounterKind, value: u64) -> Self {
        self.set(kind, value);
        self
    }

    /// 计数器自增，缺失时从 0 开始，返回新值
    pub fn increment(&mut self, kind: CounterKind, delta: u64) -> u64 {
        let value = self.0.entry(kind).or_insert(0);
        *value = value.saturating_add(delta);
        *value
    }

    pub fn iter(&self) -> impl Iterator<Item = (CounterKind, u64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(CounterKind, u64)> for UserCounters {
    fn from_iter<I: IntoIterator<Item = (CounterKind, u64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// 已获得的成就/徽章 ID 集合
///
/// 档案中以 `{id: bool}` 形式存储，只有值为 true 的条目视为已获得。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EarnedSet(BTreeSet<String>);

impl EarnedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 从档案中的布尔标记表构建
    pub fn from_flags(flags: &HashMap<String, bool>) -> Self {
        Self(
            flags
                .iter()
                .filter(|(_, earned)| **earned)
                .map(|(id, _)| id.clone())
                .collect(),
        )
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: impl Into<String>) -> bool {
        self.0.insert(id.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for EarnedSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
