//! 计分引擎集成测试
//!
//! 覆盖阈值判定、幂等性、单调性以及规则表热替换后的完整评估流程。

use achievement_engine::{
    AchievementDefinition, AchievementEvaluator, BadgeDefinition, BadgeEvaluator, BadgeRank,
    Catalog, CatalogHandle, CounterKind, EarnedSet, ScoreEvaluator, ScoreSnapshot, UserCounters,
};

/// 把评估结果应用到快照上，模拟写回档案
fn apply(snapshot: &mut ScoreSnapshot, catalog: &Catalog) -> u64 {
    let outcome = ScoreEvaluator::evaluate(catalog, snapshot);
    let update = outcome.to_update();
    for id in &update.achievements {
        snapshot.achievements.insert(id.clone());
    }
    for id in &update.badges {
        snapshot.badges.insert(id.clone());
    }
    snapshot.score += update.points;
    update.points
}

// ==================== 阈值判定 ====================

#[test]
fn test_output_iff_threshold_met_and_not_earned() {
    let catalog = Catalog::urbindex();

    for kind in CounterKind::ALL {
        for value in 0..=60u64 {
            // 用阈值为奇数的成就构造一个“已获得”集合
            let earned: EarnedSet = catalog
                .achievements_for(kind)
                .filter(|a| a.threshold % 2 == 1)
                .map(|a| a.id.clone())
                .collect();

            let outcome = AchievementEvaluator::evaluate(&catalog, kind, Some(value), &earned);
            let ids = outcome.ids();

            for def in catalog.achievements_for(kind) {
                let expected = value >= def.threshold && !earned.contains(&def.id);
                assert_eq!(
                    ids.contains(&def.id.as_str()),
                    expected,
                    "kind={kind} value={value} achievement={}",
                    def.id
                );
            }

            let expected_points: u64 = outcome.newly_earned.iter().map(|a| a.points).sum();
            assert_eq!(outcome.points, expected_points);
        }
    }
}

#[test]
fn test_spec_examples() {
    let catalog = Catalog::urbindex();

    let outcome =
        AchievementEvaluator::evaluate(&catalog, CounterKind::Locations, Some(5), &EarnedSet::new());
    assert_eq!(outcome.ids(), vec!["explorer", "adventurer"]);
    assert_eq!(outcome.points, 35);

    let earned: EarnedSet = ["explorer"].into_iter().collect();
    let outcome = AchievementEvaluator::evaluate(&catalog, CounterKind::Locations, Some(5), &earned);
    assert_eq!(outcome.ids(), vec!["adventurer"]);
    assert_eq!(outcome.points, 25);
}

// ==================== 幂等性 ====================

#[test]
fn test_second_evaluation_is_empty() {
    let catalog = Catalog::urbindex();
    let mut snapshot = ScoreSnapshot {
        counters: UserCounters::new()
            .with(CounterKind::Locations, 12)
            .with(CounterKind::Territories, 6)
            .with(CounterKind::PhotosUploaded, 30),
        ..Default::default()
    };

    let first = apply(&mut snapshot, &catalog);
    assert!(first > 0);

    let second = ScoreEvaluator::evaluate(&catalog, &snapshot);
    assert!(second.achievements.is_empty());
    assert_eq!(second.points_awarded, second.badge.as_ref().map(|b| b.points).unwrap_or(0));
}

#[test]
fn test_repeated_evaluation_converges() {
    let catalog = Catalog::urbindex();
    let mut snapshot = ScoreSnapshot {
        counters: UserCounters::new().with(CounterKind::Locations, 50),
        ..Default::default()
    };

    // 徽章奖励积分可能在下一轮触发更高一级，最多五级即收敛
    for _ in 0..6 {
        apply(&mut snapshot, &catalog);
    }
    let outcome = ScoreEvaluator::evaluate(&catalog, &snapshot);
    assert!(outcome.is_empty());
    assert_eq!(outcome.points_awarded, 0);
}

// ==================== 单调性 ====================

#[test]
fn test_increasing_counter_never_removes_grants() {
    let catalog = Catalog::urbindex();
    let mut snapshot = ScoreSnapshot::default();
    let mut previous_achievements = EarnedSet::new();
    let mut previous_score = 0;

    for step in 1..=60u64 {
        snapshot.counters.increment(CounterKind::Locations, 1);
        if step % 3 == 0 {
            snapshot.counters.increment(CounterKind::Comments, 2);
        }
        apply(&mut snapshot, &catalog);

        for id in previous_achievements.iter() {
            assert!(snapshot.achievements.contains(id), "{id} lost at step {step}");
        }
        assert!(snapshot.score >= previous_score);

        previous_achievements = snapshot.achievements.clone();
        previous_score = snapshot.score;
    }

    assert!(snapshot.achievements.contains("cartographer"));
    assert!(!snapshot.achievements.contains("storyteller"));
}

#[test]
fn test_batch_import_equals_stepwise_achievements() {
    let catalog = Catalog::urbindex();

    let mut batch = ScoreSnapshot {
        counters: UserCounters::new().with(CounterKind::GeocachesFound, 10),
        ..Default::default()
    };
    apply(&mut batch, &catalog);

    let mut stepwise = ScoreSnapshot::default();
    for _ in 0..10 {
        stepwise.counters.increment(CounterKind::GeocachesFound, 1);
        apply(&mut stepwise, &catalog);
    }

    assert_eq!(batch.achievements, stepwise.achievements);
    assert!(batch.achievements.contains("cache_hunter"));
    assert!(batch.achievements.contains("treasure_seeker"));
}

// ==================== 徽章阶梯 ====================

#[test]
fn test_badge_ladder_only_moves_forward() {
    let catalog = Catalog::urbindex();
    let mut earned = EarnedSet::new();
    let mut last_rank: Option<BadgeRank> = None;

    for score in (0..=3000u64).step_by(25) {
        let outcome = BadgeEvaluator::evaluate(&catalog, score, &earned);
        if let Some(badge) = &outcome.badge {
            assert!(last_rank.is_none_or(|r| badge.rank > r));
            last_rank = Some(badge.rank);
            for id in &outcome.implied {
                earned.insert(id.clone());
            }
            earned.insert(badge.id.clone());
        }
    }

    assert_eq!(last_rank, Some(BadgeRank::Master));
    assert_eq!(earned.len(), 5);
}

// ==================== 自定义规则表 ====================

#[test]
fn test_custom_catalog_through_handle() {
    let handle = CatalogHandle::default();

    let custom = Catalog::new(
        vec![
            AchievementDefinition::new("first_spot", "First Spot", CounterKind::Locations, 1, 100),
            AchievementDefinition::new("tenth_spot", "Tenth Spot", CounterKind::Locations, 10, 400),
        ],
        vec![
            BadgeDefinition::new("bronze", "Bronze", BadgeRank::Novice, 100, 0),
            BadgeDefinition::new("silver", "Silver", BadgeRank::Intermediate, 500, 0),
        ],
    )
    .unwrap();
    handle.replace(custom);

    let catalog = handle.load();
    let snapshot = ScoreSnapshot {
        counters: UserCounters::new().with(CounterKind::Locations, 10),
        ..Default::default()
    };
    let outcome = ScoreEvaluator::evaluate(&catalog, &snapshot);

    assert_eq!(outcome.achievements.len(), 2);
    assert_eq!(outcome.badge.as_ref().map(|b| b.id.as_str()), Some("silver"));
    assert_eq!(outcome.implied_badges, vec!["bronze".to_string()]);
    assert_eq!(outcome.new_score, 500);
}

#[test]
fn test_example_catalog_file_reloads_into_handle() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config/catalog.example.json");
    let handle = CatalogHandle::default();

    handle.reload_from_file(&path).unwrap();

    let catalog = handle.load();
    assert_eq!(catalog.achievements().len(), 3);
    assert_eq!(catalog.achievements_for(CounterKind::NightLocations).count(), 1);
    assert!(catalog.badge("intermediate").is_some());
}
