//! Refresh token repository

use super::{SessionStore, StoreError, StoreResult};
use crate::models::session::RefreshTokenRecord;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgSessionStore {
    db: PgPool,
}

impl PgSessionStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    /// 存储刷新令牌
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, token_hash, user_id, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(&record.token_hash)
        .bind(record.user_id)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn get_valid_refresh_token(&self, token: &str) -> StoreResult<RefreshTokenRecord> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, token_hash, user_id, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1 AND expires_at > NOW()
            "#,
        )
        .bind(RefreshTokenRecord::hash_token(token))
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// One conditional DELETE: the row lock taken by the delete serialises
    /// concurrent consumers, and only the one that removes the row gets it back.
    async fn consume_refresh_token(&self, token: &str) -> StoreResult<RefreshTokenRecord> {
        sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            DELETE FROM refresh_tokens
            WHERE token_hash = $1 AND expires_at > NOW()
            RETURNING id, token_hash, user_id, expires_at, created_at
            "#,
        )
        .bind(RefreshTokenRecord::hash_token(token))
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn delete_refresh_token(&self, token: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(RefreshTokenRecord::hash_token(token))
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn delete_refresh_token_by_id(&self, id: Uuid) -> StoreResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;

        Ok(())
    }

    /// 清理过期的刷新令牌
    async fn purge_expired(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(&self.db)
            .await?;

        Ok(result.rows_affected())
    }
}
