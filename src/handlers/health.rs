//! 健康检查处理器
//! 提供 /health 和 /ready 端点

use axum::{extract::State, Json};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::{db, middleware::AppState};

/// 存活探针响应
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// 就绪探针响应
#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: Vec<HealthCheck>,
}

/// 健康检查项
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

static APP_START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

/// 设置应用启动时间（在 main.rs 中尽早调用）
pub fn set_start_time() {
    Lazy::force(&APP_START_TIME);
}

/// 获取应用运行时间（秒）
pub fn get_uptime() -> u64 {
    APP_START_TIME.elapsed().as_secs()
}

/// 存活探针
/// 快速响应，不检查依赖
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: get_uptime(),
    })
}

/// 就绪探针
/// 有数据库时在存储超时内 ping 一次
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> Json<ReadinessResponse> {
    let mut checks = Vec::new();

    if let Some(pool) = &state.db {
        let check = match db::ping(pool, state.config.security.store_timeout()).await {
            Ok(()) => HealthCheck {
                name: "database".to_string(),
                status: "healthy".to_string(),
                message: None,
            },
            Err(e) => {
                tracing::warn!(error = %e, "Readiness check failed");
                HealthCheck {
                    name: "database".to_string(),
                    status: "unhealthy".to_string(),
                    message: Some(e.to_string()),
                }
            }
        };
        checks.push(check);
    }

    let all_healthy = checks.iter().all(|c| c.status == "healthy");

    Json(ReadinessResponse {
        ready: all_healthy,
        checks,
    })
}
