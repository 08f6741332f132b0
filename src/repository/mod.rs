//! Database repository layer
//!
//! Store contracts consumed by the auth service plus their PostgreSQL and
//! in-process implementations. Every store owns its own atomicity: callers
//! never lock around a store call.

pub mod cart_repo;
pub mod memory;
pub mod session_repo;
pub mod user_repo;

pub use cart_repo::PgCartStore;
pub use memory::{MemoryAccountStore, MemoryCartStore, MemorySessionStore};
pub use session_repo::PgSessionStore;
pub use user_repo::PgAccountStore;

use crate::models::{
    cart::Cart,
    session::RefreshTokenRecord,
    user::{Account, NewAccount},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Store failure as seen by callers
#[derive(Debug, Error)]
pub enum StoreError {
    /// Absent, or (for refresh tokens) expired. The two are indistinguishable.
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => {
                tracing::warn!(error = %e, "Store operation failed");
                StoreError::Unavailable(e.to_string())
            }
        }
    }
}

/// Account persistence
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Account>;

    async fn find_by_email_active(&self, email: &str) -> StoreResult<Account>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Account>;

    /// Fails with `Conflict` when the email is already taken
    async fn create(&self, account: NewAccount) -> StoreResult<Account>;

    async fn update(&self, account: &Account) -> StoreResult<Account>;
}

/// Refresh token persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fails with `Conflict` when the token already exists
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> StoreResult<()>;

    /// Returns the record only if it exists and expires strictly after now
    async fn get_valid_refresh_token(&self, token: &str) -> StoreResult<RefreshTokenRecord>;

    /// Atomically remove a valid record and hand it back. Of any number of
    /// concurrent callers presenting the same token, at most one gets `Ok`.
    async fn consume_refresh_token(&self, token: &str) -> StoreResult<RefreshTokenRecord>;

    /// Idempotent
    async fn delete_refresh_token(&self, token: &str) -> StoreResult<()>;

    /// Idempotent
    async fn delete_refresh_token_by_id(&self, id: Uuid) -> StoreResult<()>;

    /// Drop expired records, returning how many went
    async fn purge_expired(&self) -> StoreResult<u64>;
}

/// Cart persistence (only what registration needs)
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn create_for_account(&self, account_id: Uuid) -> StoreResult<Cart>;

    async fn find_by_account(&self, account_id: Uuid) -> StoreResult<Cart>;
}

/// The stores the auth service works against
#[derive(Clone)]
pub struct Stores {
    pub accounts: Arc<dyn AccountStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub carts: Arc<dyn CartStore>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            accounts: Arc::new(PgAccountStore::new(pool.clone())),
            sessions: Arc::new(PgSessionStore::new(pool.clone())),
            carts: Arc::new(PgCartStore::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            accounts: Arc::new(MemoryAccountStore::new()),
            sessions: Arc::new(MemorySessionStore::new()),
            carts: Arc::new(MemoryCartStore::new()),
        }
    }
}
