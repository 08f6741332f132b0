//! PostgreSQL 存储引导
//! 连接池、内嵌迁移和就绪探测。失败统一归入 StoreError::Unavailable，
//! 与认证服务看到的存储错误同一套分类。

use crate::{
    config::DatabaseConfig,
    repository::{StoreError, StoreResult},
};
use secrecy::ExposeSecret;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;

fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
        .test_before_acquire(true)
}

/// 打开连接池，至少建立一条连接后返回
pub async fn connect(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let pool = pool_options(config)
        .connect(config.url.expose_secret())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to open store pool");
            StoreError::Unavailable(format!("connect: {}", e))
        })?;

    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Store pool opened"
    );

    Ok(pool)
}

/// Apply the embedded users, carts and refresh_tokens migrations
pub async fn migrate(pool: &PgPool) -> StoreResult<()> {
    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        tracing::error!(error = %e, "Store migration failed");
        StoreError::Unavailable(format!("migrate: {}", e))
    })?;

    tracing::info!("Store schema up to date");
    Ok(())
}

/// 就绪探测：在 deadline 内完成一次往返
pub async fn ping(pool: &PgPool, deadline: Duration) -> StoreResult<()> {
    match tokio::time::timeout(deadline, sqlx::query("SELECT 1").execute(pool)).await {
        Ok(result) => result.map(|_| ()).map_err(StoreError::from),
        Err(_) => Err(StoreError::Unavailable("ping timed out".to_string())),
    }
}
