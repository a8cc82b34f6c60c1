//! 计分流程集成测试
//!
//! 使用内存仓储和队列通知渠道验证完整流程；PostgreSQL 测试需要数据库，默认忽略。

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use achievement_engine::{
    AchievementDefinition, BadgeDefinition, BadgeRank, Catalog, CatalogHandle, CounterKind,
    RewardUpdate,
};
use async_trait::async_trait;
use fake::Fake;
use fake::faker::internet::en::Username;
use tokio::sync::mpsc::Receiver;
use tokio::sync::watch;
use urbindex_shared::events::{Activity, ActivityEvent};

use achievement_service::consumer::LineConsumer;
use achievement_service::models::UserProfile;
use achievement_service::notification::{
    Notification, NotificationSender, NotificationService, NotificationType, QueueChannel,
};
use achievement_service::processor::ActivityEventProcessor;
use achievement_service::repository::{
    MemoryProfileRepository, PgProfileRepository, ProfileRepository,
};
use achievement_service::service::ScoringService;
use achievement_service::{AchievementError, Result};

struct Harness {
    repo: Arc<MemoryProfileRepository>,
    scoring: Arc<ScoringService<MemoryProfileRepository>>,
    processor: ActivityEventProcessor<MemoryProfileRepository>,
    notifications: Receiver<Notification>,
}

async fn harness(catalog: CatalogHandle) -> Harness {
    let repo = Arc::new(MemoryProfileRepository::new());
    let scoring = Arc::new(ScoringService::new(repo.clone(), catalog));

    let (queue, notifications) = QueueChannel::new(64);
    let mut service = NotificationService::new();
    service.register_channel(Arc::new(queue));
    scoring
        .set_notification_sender(Arc::new(NotificationSender::new(Arc::new(service), false)))
        .await;

    let processor = ActivityEventProcessor::new(scoring.clone(), Duration::from_secs(3600));
    Harness {
        repo,
        scoring,
        processor,
        notifications,
    }
}

fn drain(rx: &mut Receiver<Notification>) -> Vec<Notification> {
    let mut out = Vec::new();
    while let Ok(n) = rx.try_recv() {
        out.push(n);
    }
    out
}

fn random_user() -> String {
    Username().fake()
}

#[tokio::test]
async fn test_location_milestones_unlock_in_order() {
    let mut h = harness(CatalogHandle::default()).await;
    let user = random_user();

    let mut unlocked = Vec::new();
    for _ in 0..5 {
        let event = ActivityEvent::new(&user, Activity::LocationAdded { night: false }, "web");
        let result = h.processor.handle(&event).await.unwrap();
        assert!(result.processed);
        unlocked.extend(result.granted_achievements);
    }

    assert_eq!(unlocked, vec!["explorer", "adventurer"]);

    let profile = h.repo.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(profile.counters.get(CounterKind::Locations), Some(5));
    assert_eq!(profile.score, 35);
    assert!(profile.has_achievement("explorer"));
    assert!(profile.has_achievement("adventurer"));

    let notifications = drain(&mut h.notifications);
    assert_eq!(notifications.len(), 2);
    assert!(
        notifications
            .iter()
            .all(|n| n.notification_type == NotificationType::AchievementUnlocked && n.user_id == user)
    );
}

#[tokio::test]
async fn test_batch_import_crosses_several_thresholds_at_once() {
    let mut h = harness(CatalogHandle::default()).await;
    let user = random_user();

    let event = ActivityEvent::new(
        &user,
        Activity::BatchImport {
            counter: "locationsCount".to_string(),
            count: 10,
        },
        "import",
    );
    let result = h.processor.handle(&event).await.unwrap();

    assert_eq!(
        result.granted_achievements,
        vec!["explorer", "adventurer", "pathfinder"]
    );
    assert_eq!(result.granted_badge.as_deref(), Some("novice"));
    assert_eq!(result.points_awarded, 85);

    let profile = h.repo.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(profile.score, 85);
    assert!(profile.has_badge("novice"));

    let types: Vec<_> = drain(&mut h.notifications)
        .into_iter()
        .map(|n| n.notification_type)
        .collect();
    assert_eq!(
        types.iter().filter(|t| **t == NotificationType::BadgeEarned).count(),
        1
    );
    assert_eq!(types.len(), 4);
}

#[tokio::test]
async fn test_redelivered_events_do_not_double_count() {
    let mut h = harness(CatalogHandle::default()).await;
    let user = random_user();

    let events: Vec<_> = (0..3)
        .map(|_| ActivityEvent::new(&user, Activity::LocationAdded { night: true }, "web"))
        .collect();

    for event in events.iter().chain(events.iter()) {
        h.processor.handle(event).await.unwrap();
    }

    let profile = h.repo.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(profile.counters.get(CounterKind::Locations), Some(3));
    assert_eq!(profile.counters.get(CounterKind::NightLocations), Some(3));
    // explorer + night_owl
    assert_eq!(profile.score, 30);
    assert_eq!(drain(&mut h.notifications).len(), 2);
}

#[tokio::test]
async fn test_reevaluation_is_idempotent() {
    let mut h = harness(CatalogHandle::default()).await;
    let user = random_user();

    h.scoring
        .record_activity(&user, CounterKind::Territories, 5)
        .await
        .unwrap();
    let first = drain(&mut h.notifications).len();

    let again = h.scoring.evaluate_user(&user).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(drain(&mut h.notifications).len(), 0);
    // claimer + warlord + novice 徽章
    assert_eq!(first, 3);
}

#[tokio::test]
async fn test_catalog_replacement_applies_to_next_evaluation() {
    let catalog = CatalogHandle::default();
    let h = harness(catalog.clone()).await;
    let user = random_user();

    h.scoring
        .record_activity(&user, CounterKind::PhotosUploaded, 3)
        .await
        .unwrap();

    catalog.replace(
        Catalog::new(
            vec![AchievementDefinition::new(
                "triple_shot",
                "Triple Shot",
                CounterKind::PhotosUploaded,
                3,
                40,
            )],
            vec![BadgeDefinition::new("novice", "Novice", BadgeRank::Novice, 45, 5)],
        )
        .unwrap(),
    );

    let outcome = h.scoring.evaluate_user(&user).await.unwrap();
    assert_eq!(outcome.achievements[0].id, "triple_shot");
    assert_eq!(outcome.badge.map(|b| b.id), Some("novice".to_string()));

    let profile = h.repo.get_profile(&user).await.unwrap().unwrap();
    // photographer(10) + triple_shot(40) + novice 奖励(5)
    assert_eq!(profile.score, 55);
}

#[tokio::test]
async fn test_unknown_user_has_no_rewards() {
    let h = harness(CatalogHandle::default()).await;
    let outcome = h.scoring.evaluate_user("nobody").await.unwrap();
    assert!(outcome.is_empty());
    assert!(h.repo.is_empty());
}

/// 指定计数器前 N 次自增失败的内存仓储
struct FlakyRepository {
    inner: MemoryProfileRepository,
    failing: CounterKind,
    failures_left: AtomicU32,
}

#[async_trait]
impl ProfileRepository for FlakyRepository {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>> {
        self.inner.get_profile(user_id).await
    }

    async fn increment_counter(&self, user_id: &str, kind: CounterKind, delta: u64) -> Result<u64> {
        if kind == self.failing
            && self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(AchievementError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.increment_counter(user_id, kind, delta).await
    }

    async fn apply_rewards(&self, user_id: &str, update: &RewardUpdate) -> Result<()> {
        self.inner.apply_rewards(user_id, update).await
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        self.inner.save_profile(profile).await
    }
}

#[tokio::test]
async fn test_failed_event_redelivery_counts_once() {
    let repo = Arc::new(FlakyRepository {
        inner: MemoryProfileRepository::new(),
        failing: CounterKind::NightLocations,
        failures_left: AtomicU32::new(1),
    });
    let scoring = Arc::new(ScoringService::new(repo.clone(), CatalogHandle::default()));
    let processor = ActivityEventProcessor::new(scoring, Duration::from_secs(3600));
    let user = random_user();
    let event = ActivityEvent::new(&user, Activity::LocationAdded { night: true }, "web");

    let first = processor.handle(&event).await.unwrap();
    assert!(!first.processed);
    assert!(first.granted_achievements.is_empty());

    let retry = processor.handle(&event).await.unwrap();
    assert!(retry.processed);
    assert_eq!(retry.granted_achievements, vec!["explorer", "night_owl"]);

    let again = processor.handle(&event).await.unwrap();
    assert!(again.duplicate);

    let profile = repo.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(profile.counters.get(CounterKind::Locations), Some(1));
    assert_eq!(profile.counters.get(CounterKind::NightLocations), Some(1));
    assert_eq!(profile.score, 30);
}

#[tokio::test]
async fn test_long_running_consumer_evicts_expired_records() {
    let repo = Arc::new(MemoryProfileRepository::new());
    let scoring = Arc::new(ScoringService::new(repo.clone(), CatalogHandle::default()));
    let consumer = Arc::new(
        LineConsumer::new(ActivityEventProcessor::new(scoring, Duration::from_millis(20)))
            .with_purge_interval(Duration::from_millis(10)),
    );

    let (mut client, server) = tokio::io::duplex(64 * 1024);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running = consumer.clone();
    let handle = tokio::spawn(async move {
        running
            .run(tokio::io::BufReader::new(server), shutdown_rx)
            .await
    });

    let user = random_user();
    for _ in 0..200 {
        let event = ActivityEvent::new(&user, Activity::CommentPosted, "web");
        let mut line = serde_json::to_string(&event).unwrap();
        line.push('\n');
        tokio::io::AsyncWriteExt::write_all(&mut client, line.as_bytes())
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(consumer.processor().tracked_events(), 0);

    shutdown_tx.send(true).unwrap();
    let stats = tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(stats.processed, 200);

    let profile = repo.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(profile.counters.get(CounterKind::Comments), Some(200));
}

#[tokio::test]
#[ignore] // 需要数据库连接
async fn test_pg_profile_repository() {
    let config = urbindex_shared::config::DatabaseConfig::default();
    let db = urbindex_shared::database::Database::connect(&config)
        .await
        .unwrap();
    let repo = PgProfileRepository::new(db.pool().clone());
    repo.migrate().await.unwrap();

    let user = format!("it-{}", uuid::Uuid::now_v7());
    assert_eq!(
        repo.increment_counter(&user, CounterKind::Comments, 2)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        repo.increment_counter(&user, CounterKind::Comments, 3)
            .await
            .unwrap(),
        5
    );

    repo.apply_rewards(
        &user,
        &RewardUpdate {
            achievements: vec!["commentator".to_string()],
            badges: vec![],
            points: 5,
        },
    )
    .await
    .unwrap();

    let profile = repo.get_profile(&user).await.unwrap().unwrap();
    assert_eq!(profile.counters.get(CounterKind::Comments), Some(5));
    assert!(profile.has_achievement("commentator"));
    assert_eq!(profile.score, 5);
}
