//! 成就计分服务
//!
//! 从标准输入读取 JSON-lines 活动事件，直到输入结束或 Ctrl-C。

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use achievement_engine::{Catalog, CatalogHandle};
use anyhow::Result;
use tokio::io::BufReader;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use urbindex_shared::config::{AppConfig, StoreBackend};
use urbindex_shared::database::Database;
use urbindex_shared::observability;

use achievement_service::{
    consumer::LineConsumer,
    notification::{NotificationSender, NotificationService},
    processor::ActivityEventProcessor,
    repository::{MemoryProfileRepository, PgProfileRepository, ProfileRepository},
    service::ScoringService,
};

const SERVICE_NAME: &str = "achievement-service";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载配置
    let config = AppConfig::load(SERVICE_NAME).unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {e}");
        AppConfig {
            service_name: SERVICE_NAME.to_string(),
            ..AppConfig::default()
        }
    });

    // 2. 初始化可观测性
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    info!("Starting {SERVICE_NAME}...");
    info!(
        environment = %config.environment,
        store = ?config.scoring.store,
        "Configuration loaded"
    );

    // 3. 规则表
    let catalog = match &config.scoring.catalog_path {
        Some(path) => Catalog::from_file(Path::new(path))?,
        None => Catalog::urbindex(),
    };
    info!(
        achievements = catalog.achievements().len(),
        badges = catalog.badges().len(),
        "Catalog loaded"
    );
    let catalog = CatalogHandle::new(catalog);

    // 4. 按配置选择存储后端
    match config.scoring.store {
        StoreBackend::Memory => {
            warn!("Using in-memory profile store, data will not survive restart");
            run(Arc::new(MemoryProfileRepository::new()), catalog, &config).await
        }
        StoreBackend::Postgres => {
            let db = Database::connect(&config.database).await?;
            let repo = PgProfileRepository::new(db.pool().clone());
            repo.migrate().await?;
            info!("Database connection established");

            let result = run(Arc::new(repo), catalog, &config).await;
            db.close().await;
            result
        }
    }
}

async fn run<R>(repo: Arc<R>, catalog: CatalogHandle, config: &AppConfig) -> Result<()>
where
    R: ProfileRepository + 'static,
{
    // 5. 计分服务与通知
    let scoring = Arc::new(ScoringService::new(repo, catalog));
    let sender = if config.scoring.notifications_enabled {
        let notification_service = Arc::new(NotificationService::with_defaults());
        let sender = Arc::new(NotificationSender::new(
            notification_service,
            config.scoring.async_notifications,
        ));
        scoring.set_notification_sender(sender.clone()).await;
        Some(sender)
    } else {
        None
    };

    // 6. 事件处理器与消费者
    let processor = ActivityEventProcessor::new(
        scoring,
        Duration::from_secs(config.scoring.idempotency_ttl_seconds),
    );
    let consumer = LineConsumer::new(processor).with_purge_interval(Duration::from_secs(
        config.scoring.idempotency_purge_interval_seconds,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, shutting down...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                // 保留发送端，消费者只在输入结束时退出
                warn!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        }
    });

    let stats = consumer
        .run(BufReader::new(tokio::io::stdin()), shutdown_rx)
        .await?;

    // 7. 等待后台通知发送完成
    if let Some(sender) = sender {
        sender.shutdown().await;
    }

    info!(
        received = stats.received,
        processed = stats.processed,
        duplicates = stats.duplicates,
        failed = stats.failed,
        malformed = stats.malformed,
        "{SERVICE_NAME} stopped"
    );
    Ok(())
}
