//! User repository (数据库访问层)

use super::{AccountStore, StoreError, StoreResult};
use crate::models::user::{Account, NewAccount};
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, role, is_active, created_at, updated_at";

pub struct PgAccountStore {
    db: PgPool,
}

impl PgAccountStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    /// 根据邮箱查找用户
    async fn find_by_email(&self, email: &str) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn find_by_email_active(&self, email: &str) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE email = $1 AND is_active = TRUE"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// 根据 ID 查找用户
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    /// 创建用户
    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let created = sqlx::query_as::<_, Account>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(account.role.as_str())
        .fetch_one(&self.db)
        .await?;

        Ok(created)
    }

    /// 更新用户
    async fn update(&self, account: &Account) -> StoreResult<Account> {
        sqlx::query_as::<_, Account>(&format!(
            r#"
            UPDATE users
            SET
                email = $2,
                password_hash = $3,
                first_name = $4,
                last_name = $5,
                phone = $6,
                role = $7,
                is_active = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.phone)
        .bind(account.role.as_str())
        .bind(account.is_active)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}
