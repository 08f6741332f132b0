//! 日志与追踪系统
//! 初始化结构化日志和指标描述

use crate::config::LoggingConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 初始化日志与追踪系统
///
/// RUST_LOG 优先于配置中的日志级别。重复初始化返回错误而不是 panic。
pub fn init_telemetry(config: &LoggingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_layer = match config.format.to_lowercase().as_str() {
        "pretty" => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .boxed(),
        // JSON 格式（生产环境）
        _ => tracing_subscriber::fmt::layer()
            .json()
            .with_target(false)
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(log_layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        level = %config.level,
        format = %config.format,
        "Telemetry initialized"
    );

    Ok(())
}

/// 注册认证指标的说明
///
/// metrics 0.24 在首次使用时创建指标，这里只补充描述，供导出端展示。
pub fn init_metrics() {
    metrics::describe_counter!("auth.register.success", "Accounts registered");
    metrics::describe_counter!("auth.login.success", "Successful logins");
    metrics::describe_counter!("auth.login.failure", "Rejected logins (unknown email or wrong password)");
    metrics::describe_counter!("auth.refresh.success", "Refresh tokens rotated");
    metrics::describe_counter!("auth.refresh.rejected", "Refresh attempts with an unusable token");
    metrics::describe_counter!("auth.logout", "Logout calls");
    metrics::describe_counter!("auth.event.publish_failed", "Auth events that could not be published");
    metrics::describe_counter!("http_requests_total", "HTTP requests by method and status class");
    metrics::describe_histogram!("http_request_duration_seconds", "HTTP request latency");

    tracing::debug!("Metrics initialized");
}
