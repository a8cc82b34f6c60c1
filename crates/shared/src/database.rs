//! PostgreSQL 连接池
//!
//! 只在档案存储后端为 `postgres` 时创建。

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::Result;

pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 按配置建立连接池，连接失败时返回 `UrbindexError::Database`
    #[instrument(skip(config), fields(max_connections = config.max_connections))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!("档案数据库连接池已建立");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 等待在用连接归还后关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("档案数据库连接池已关闭");
    }
}
