//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试

use achievement_engine::{CounterKind, RewardUpdate};
use async_trait::async_trait;

use crate::error::Result;
use crate::models::UserProfile;

/// 用户档案仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>>;

    /// 计数器自增，返回新值；档案不存在时自动创建
    async fn increment_counter(&self, user_id: &str, kind: CounterKind, delta: u64)
    -> Result<u64>;

    /// 写回奖励：只把标记置为 true 并累加积分
    async fn apply_rewards(&self, user_id: &str, update: &RewardUpdate) -> Result<()>;

    /// 整体写入档案（导入、初始化用）
    async fn save_profile(&self, profile: &UserProfile) -> Result<()>;
}
