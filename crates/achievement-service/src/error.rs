//! 计分服务错误类型
//!
//! 定义服务层的业务错误和系统错误

use achievement_engine::CatalogError;
use thiserror::Error;
use urbindex_shared::error::UrbindexError;

/// 计分服务错误类型
#[derive(Debug, Error)]
pub enum AchievementError {
    // === 业务错误 ===
    #[error("用户档案不存在: {0}")]
    ProfileNotFound(String),

    #[error("未知的计数器: {0}")]
    UnknownCounter(String),

    #[error("参数校验失败: {0}")]
    Validation(String),

    // === 规则表错误 ===
    #[error("规则表错误: {0}")]
    Catalog(#[from] CatalogError),

    // === 通知错误 ===
    #[error("通知渠道 {channel} 发送失败: {message}")]
    ChannelFailed { channel: String, message: String },

    // === 系统错误 ===
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("数据库迁移失败: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("基础设施错误: {0}")]
    Infrastructure(#[from] UrbindexError),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 计分服务 Result 类型别名
pub type Result<T> = std::result::Result<T, AchievementError>;

impl AchievementError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Database(_) => true,
            Self::Infrastructure(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        matches!(
            self,
            Self::ProfileNotFound(_) | Self::UnknownCounter(_) | Self::Validation(_)
        )
    }

    /// 获取错误码
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            Self::UnknownCounter(_) => "UNKNOWN_COUNTER",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Catalog(_) => "CATALOG_ERROR",
            Self::ChannelFailed { .. } => "CHANNEL_FAILED",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Migration(_) => "MIGRATION_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Infrastructure(e) => e.code(),
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<AchievementError> for UrbindexError {
    fn from(err: AchievementError) -> Self {
        match err {
            AchievementError::Infrastructure(e) => e,
            AchievementError::Database(e) => UrbindexError::Database(e),
            AchievementError::Serialization(e) => UrbindexError::Serialization(e),
            AchievementError::Validation(msg) => UrbindexError::Validation(msg),
            AchievementError::UnknownCounter(name) => UrbindexError::InvalidArgument {
                field: "counter".to_string(),
                message: format!("未知的计数器: {name}"),
            },
            other => UrbindexError::Internal(other.to_string()),
        }
    }
}
