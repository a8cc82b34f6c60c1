//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use super::ObservabilityConfig;

/// 初始化 Prometheus 指标导出
///
/// 在指定端口启动 `/metrics` 端点，需要在 tokio 运行时内调用。
pub fn init(config: &ObservabilityConfig) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe();
    metrics::counter!("service_starts_total", "service" => config.service_name.clone())
        .increment(1);

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// 注册业务指标描述
pub fn describe() {
    metrics::describe_counter!(
        "score_evaluations_total",
        "Total number of score evaluations"
    );
    metrics::describe_histogram!(
        "score_evaluation_duration_seconds",
        "Score evaluation duration in seconds"
    );
    metrics::describe_counter!(
        "achievements_granted_total",
        "Total number of achievements granted"
    );
    metrics::describe_counter!("badges_granted_total", "Total number of badges granted");
    metrics::describe_counter!(
        "activity_events_total",
        "Total number of activity events processed"
    );
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录一次计分评估
#[inline]
pub fn record_score_evaluation(status: &str, duration_secs: f64) {
    metrics::counter!("score_evaluations_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("score_evaluation_duration_seconds", "status" => status.to_string())
        .record(duration_secs);
}

/// 记录成就发放
#[inline]
pub fn record_achievement_granted(achievement_id: &str, category: &str) {
    metrics::counter!(
        "achievements_granted_total",
        "achievement_id" => achievement_id.to_string(),
        "category" => category.to_string()
    )
    .increment(1);
}

/// 记录徽章发放
#[inline]
pub fn record_badge_granted(badge_id: &str) {
    metrics::counter!("badges_granted_total", "badge_id" => badge_id.to_string()).increment(1);
}

/// 记录活动事件处理
#[inline]
pub fn record_activity_event(activity_type: &str, status: &str) {
    metrics::counter!(
        "activity_events_total",
        "activity_type" => activity_type.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_without_recorder_is_noop() {
        // 未安装 recorder 时记录指标不应 panic
        describe();
        record_score_evaluation("success", 0.001);
        record_achievement_granted("explorer", "locationsCount");
        record_badge_granted("novice");
        record_activity_event("LOCATION_ADDED", "success");
    }
}
