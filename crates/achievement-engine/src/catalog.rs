//! 规则表管理
//!
//! 规则表包含全部成就定义和徽章阶梯。支持：
//! - 内置的 Urbindex 规则表
//! - 从 JSON 字符串或文件加载
//! - 加载时校验（ID 唯一、阈值为正、徽章阶梯严格递增）
//! - 通过 `CatalogHandle` 原子替换，读取端无锁

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{CatalogError, Result};
use crate::models::{AchievementDefinition, BadgeDefinition, BadgeRank, CounterKind};

/// 成就/徽章规则表
///
/// 构造后保证：徽章按等级升序排列，成就按 (类别, 阈值, ID) 排序。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    achievements: Vec<AchievementDefinition>,
    badges: Vec<BadgeDefinition>,
}

impl Catalog {
    /// 构建并校验规则表
    pub fn new(
        achievements: Vec<AchievementDefinition>,
        badges: Vec<BadgeDefinition>,
    ) -> Result<Self> {
        let catalog = Self {
            achievements,
            badges,
        }
        .sorted();
        catalog.validate()?;
        Ok(catalog)
    }

    /// 从 JSON 加载
    pub fn from_json(json: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(default)]
            achievements: Vec<AchievementDefinition>,
            #[serde(default)]
            badges: Vec<BadgeDefinition>,
        }

        let raw: Raw = serde_json::from_str(json)?;
        Self::new(raw.achievements, raw.badges)
    }

    /// 从 JSON 文件加载
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        info!(
            achievements = catalog.achievements.len(),
            badges = catalog.badges.len(),
            "规则表已从文件加载"
        );
        Ok(catalog)
    }

    /// 内置的 Urbindex 规则表
    pub fn urbindex() -> Self {
        use CounterKind::*;

        let achievements = vec![
            // 地点
            AchievementDefinition::new("explorer", "Explorer", Locations, 1, 10)
                .with_description("Log your first location")
                .with_icon("🧭"),
            AchievementDefinition::new("adventurer", "Adventurer", Locations, 5, 25)
                .with_description("Log 5 locations")
                .with_icon("🎒"),
            AchievementDefinition::new("pathfinder", "Pathfinder", Locations, 10, 50)
                .with_description("Log 10 locations")
                .with_icon("🥾"),
            AchievementDefinition::new("urban_legend", "Urban Legend", Locations, 25, 100)
                .with_description("Log 25 locations")
                .with_icon("🏚️"),
            AchievementDefinition::new("cartographer", "Cartographer", Locations, 50, 250)
                .with_description("Log 50 locations")
                .with_icon("🗺️"),
            // 评论
            AchievementDefinition::new("commentator", "Commentator", Comments, 1, 5)
                .with_description("Post your first comment")
                .with_icon("💬"),
            AchievementDefinition::new("critic", "Critic", Comments, 10, 25)
                .with_description("Post 10 comments")
                .with_icon("📝"),
            AchievementDefinition::new("storyteller", "Storyteller", Comments, 50, 100)
                .with_description("Post 50 comments")
                .with_icon("📖"),
            // 领地
            AchievementDefinition::new("claimer", "Claimer", Territories, 1, 20)
                .with_description("Claim your first territory")
                .with_icon("🚩"),
            AchievementDefinition::new("warlord", "Warlord", Territories, 5, 75)
                .with_description("Claim 5 territories")
                .with_icon("⚔️"),
            AchievementDefinition::new("overlord", "Overlord", Territories, 20, 200)
                .with_description("Claim 20 territories")
                .with_icon("🏰"),
            // 寻宝
            AchievementDefinition::new("cache_hunter", "Cache Hunter", GeocachesFound, 1, 15)
                .with_description("Find your first geocache")
                .with_icon("📦"),
            AchievementDefinition::new("treasure_seeker", "Treasure Seeker", GeocachesFound, 10, 75)
                .with_description("Find 10 geocaches")
                .with_icon("💎"),
            // 挑战
            AchievementDefinition::new("challenger", "Challenger", ChallengesCompleted, 1, 15)
                .with_description("Complete your first challenge")
                .with_icon("🎯"),
            AchievementDefinition::new("champion", "Champion", ChallengesCompleted, 10, 100)
                .with_description("Complete 10 challenges")
                .with_icon("🏆"),
            // 照片
            AchievementDefinition::new("photographer", "Photographer", PhotosUploaded, 1, 10)
                .with_description("Upload your first photo")
                .with_icon("📷"),
            AchievementDefinition::new("shutterbug", "Shutterbug", PhotosUploaded, 25, 75)
                .with_description("Upload 25 photos")
                .with_icon("📸"),
            // 视频
            AchievementDefinition::new("videographer", "Videographer", VideosUploaded, 1, 15)
                .with_description("Upload your first video")
                .with_icon("🎥"),
            AchievementDefinition::new("filmmaker", "Filmmaker", VideosUploaded, 10, 75)
                .with_description("Upload 10 videos")
                .with_icon("🎬"),
            // 夜探
            AchievementDefinition::new("night_owl", "Night Owl", NightLocations, 1, 20)
                .with_description("Log a location after dark")
                .with_icon("🦉"),
            AchievementDefinition::new("nocturnal", "Nocturnal", NightLocations, 10, 100)
                .with_description("Log 10 locations after dark")
                .with_icon("🌙"),
        ];

        let badges = vec![
            BadgeDefinition::new("novice", "Novice", BadgeRank::Novice, 50, 0)
                .with_description("Reach 50 points")
                .with_icon("🥉"),
            BadgeDefinition::new("intermediate", "Intermediate", BadgeRank::Intermediate, 150, 10)
                .with_description("Reach 150 points")
                .with_icon("🥈"),
            BadgeDefinition::new("advanced", "Advanced", BadgeRank::Advanced, 400, 25)
                .with_description("Reach 400 points")
                .with_icon("🥇"),
            BadgeDefinition::new("expert", "Expert", BadgeRank::Expert, 1000, 50)
                .with_description("Reach 1000 points")
                .with_icon("🏅"),
            BadgeDefinition::new("master", "Master", BadgeRank::Master, 2500, 100)
                .with_description("Reach 2500 points")
                .with_icon("👑"),
        ];

        // 内置表的合法性由 test_builtin_catalog_is_valid 覆盖
        Self {
            achievements,
            badges,
        }
        .sorted()
    }

    fn sorted(mut self) -> Self {
        self.achievements.sort_by(|a, b| {
            (a.category, a.threshold, &a.id).cmp(&(b.category, b.threshold, &b.id))
        });
        self.badges.sort_by_key(|b| b.rank);
        self
    }

    /// 校验规则表
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();

        for def in &self.achievements {
            Self::check_required(&def.id, &def.name)?;
            if def.threshold == 0 {
                return Err(CatalogError::InvalidThreshold(def.id.clone()));
            }
            if !ids.insert(def.id.as_str()) {
                return Err(CatalogError::DuplicateId(def.id.clone()));
            }
        }

        let mut previous: Option<&BadgeDefinition> = None;
        for badge in &self.badges {
            Self::check_required(&badge.id, &badge.name)?;
            if badge.threshold == 0 {
                return Err(CatalogError::InvalidThreshold(badge.id.clone()));
            }
            if !ids.insert(badge.id.as_str()) {
                return Err(CatalogError::DuplicateId(badge.id.clone()));
            }
            if let Some(prev) = previous {
                if prev.rank == badge.rank {
                    return Err(CatalogError::DuplicateRank(badge.rank.to_string()));
                }
                if prev.threshold >= badge.threshold {
                    return Err(CatalogError::LadderNotAscending {
                        lower: prev.id.clone(),
                        higher: badge.id.clone(),
                    });
                }
            }
            previous = Some(badge);
        }

        Ok(())
    }

    fn check_required(id: &str, name: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(CatalogError::EmptyField {
                id: id.to_string(),
                field: "id",
            });
        }
        if name.trim().is_empty() {
            return Err(CatalogError::EmptyField {
                id: id.to_string(),
                field: "name",
            });
        }
        Ok(())
    }

    pub fn achievements(&self) -> &[AchievementDefinition] {
        &self.achievements
    }

    /// 某一计数器类别下的成就（按阈值升序）
    pub fn achievements_for(
        &self,
        kind: CounterKind,
    ) -> impl Iterator<Item = &AchievementDefinition> {
        self.achievements.iter().filter(move |a| a.category == kind)
    }

    /// 徽章阶梯（按等级升序）
    pub fn badges(&self) -> &[BadgeDefinition] {
        &self.badges
    }

    pub fn achievement(&self, id: &str) -> Option<&AchievementDefinition> {
        self.achievements.iter().find(|a| a.id == id)
    }

    pub fn badge(&self, id: &str) -> Option<&BadgeDefinition> {
        self.badges.iter().find(|b| b.id == id)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::urbindex()
    }
}

/// 可热替换的规则表句柄
///
/// 读取为一次原子 load；替换失败时保留旧规则表。
#[derive(Clone)]
pub struct CatalogHandle {
    current: Arc<ArcSwap<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(catalog)),
        }
    }

    /// 当前规则表快照
    pub fn load(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    /// 替换规则表
    pub fn replace(&self, catalog: Catalog) {
        info!(
            achievements = catalog.achievements.len(),
            badges = catalog.badges.len(),
            "规则表已替换"
        );
        self.current.store(Arc::new(catalog));
    }

    /// 从文件重新加载，失败时保留当前规则表
    pub fn reload_from_file(&self, path: &Path) -> Result<()> {
        match Catalog::from_file(path) {
            Ok(catalog) => {
                self.replace(catalog);
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "规则表重新加载失败，保留当前规则表");
                Err(e)
            }
        }
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(Catalog::urbindex())
    }
}
