//! Cart repository

use super::{CartStore, StoreError, StoreResult};
use crate::models::cart::Cart;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgCartStore {
    db: PgPool,
}

impl PgCartStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CartStore for PgCartStore {
    async fn create_for_account(&self, account_id: Uuid) -> StoreResult<Cart> {
        let cart = sqlx::query_as::<_, Cart>(
            r#"
            INSERT INTO carts (id, user_id)
            VALUES ($1, $2)
            RETURNING id, user_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(account_id)
        .fetch_one(&self.db)
        .await?;

        Ok(cart)
    }

    async fn find_by_account(&self, account_id: Uuid) -> StoreResult<Cart> {
        sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at, updated_at FROM carts WHERE user_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}
