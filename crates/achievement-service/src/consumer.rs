//! JSON-lines 事件消费者
//!
//! 逐行读取活动事件（每行一个 JSON 信封），解码后交给处理器，
//! 直到输入结束或收到 shutdown 信号。运行期间定时清理过期的幂等记录。

use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};
use urbindex_shared::events::{ActivityEvent, EventResult};

use crate::error::{AchievementError, Result};
use crate::processor::ActivityEventProcessor;
use crate::repository::ProfileRepository;

/// 消费统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerStats {
    pub received: u64,
    pub processed: u64,
    pub duplicates: u64,
    pub failed: u64,
    pub malformed: u64,
}

pub struct LineConsumer<R>
where
    R: ProfileRepository + 'static,
{
    processor: ActivityEventProcessor<R>,
    purge_interval: Duration,
}

/// 幂等记录默认清理间隔
const DEFAULT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

impl<R> LineConsumer<R>
where
    R: ProfileRepository + 'static,
{
    pub fn new(processor: ActivityEventProcessor<R>) -> Self {
        Self {
            processor,
            purge_interval: DEFAULT_PURGE_INTERVAL,
        }
    }

    /// 设置幂等记录清理间隔（最小 1 毫秒）
    pub fn with_purge_interval(mut self, interval: Duration) -> Self {
        self.purge_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn processor(&self) -> &ActivityEventProcessor<R> {
        &self.processor
    }

    /// 启动消费循环，直到输入结束或收到 shutdown 信号
    pub async fn run<Rd>(
        &self,
        reader: Rd,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<ConsumerStats>
    where
        Rd: AsyncBufRead + Unpin,
    {
        let mut lines = reader.lines();
        let mut stats = ConsumerStats::default();

        let mut purge = tokio::time::interval(self.purge_interval);
        purge.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(purge_interval_ms = self.purge_interval.as_millis() as u64, "活动事件消费者已启动");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("收到停止信号");
                        break;
                    }
                }
                _ = purge.tick() => {
                    self.processor.purge_expired();
                }
                line = lines.next_line() => {
                    let Some(line) = line.map_err(|e| AchievementError::Internal(format!("读取输入失败: {e}")))? else {
                        info!("输入已结束");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    stats.received += 1;
                    self.handle_line(&line, &mut stats).await;
                }
            }
        }

        self.processor.purge_expired();
        info!(?stats, "活动事件消费者已停止");
        Ok(stats)
    }

    /// 处理单行输入，错误只记日志
    async fn handle_line(&self, line: &str, stats: &mut ConsumerStats) {
        let event: ActivityEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                stats.malformed += 1;
                warn!(error = %e, "无法解析活动事件");
                return;
            }
        };

        match self.processor.handle(&event).await {
            Ok(result) => Self::record(&result, stats),
            Err(e) => {
                stats.failed += 1;
                error!(
                    event_id = %event.event_id,
                    error = %e,
                    code = e.code(),
                    "处理活动事件失败"
                );
            }
        }
    }

    fn record(result: &EventResult, stats: &mut ConsumerStats) {
        if result.duplicate {
            stats.duplicates += 1;
        } else if result.processed {
            stats.processed += 1;
        } else {
            stats.failed += 1;
            warn!(event_id = %result.event_id, errors = ?result.errors, "活动事件处理失败");
        }
    }
}
