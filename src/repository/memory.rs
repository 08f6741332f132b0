//! In-process stores with the same contracts as the PostgreSQL ones.
//! Used by the test-suite and for running without a database.

use super::{AccountStore, CartStore, SessionStore, StoreError, StoreResult};
use crate::models::{
    cart::Cart,
    session::RefreshTokenRecord,
    user::{Account, NewAccount},
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Accounts behind one lock so the email uniqueness check and the insert are a single step
#[derive(Default)]
pub struct MemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl MemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Account> {
        let accounts = self.accounts.read().await;
        accounts
            .values()
            .find(|a| a.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email_active(&self, email: &str) -> StoreResult<Account> {
        let accounts = self.accounts.read().await;
        accounts
            .values()
            .find(|a| a.email == email && a.is_active)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Account> {
        let accounts = self.accounts.read().await;
        accounts.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, account: NewAccount) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;

        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::Conflict(format!("email {} already exists", account.email)));
        }

        let now = Utc::now();
        let created = Account {
            id: Uuid::new_v4(),
            email: account.email,
            password_hash: account.password_hash,
            first_name: account.first_name,
            last_name: account.last_name,
            phone: account.phone,
            role: account.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(created.id, created.clone());

        Ok(created)
    }

    async fn update(&self, account: &Account) -> StoreResult<Account> {
        let mut accounts = self.accounts.write().await;

        if !accounts.contains_key(&account.id) {
            return Err(StoreError::NotFound);
        }
        if accounts
            .values()
            .any(|a| a.id != account.id && a.email == account.email)
        {
            return Err(StoreError::Conflict(format!("email {} already exists", account.email)));
        }

        let mut updated = account.clone();
        updated.updated_at = Utc::now();
        accounts.insert(updated.id, updated.clone());

        Ok(updated)
    }
}

/// Refresh tokens keyed by token hash
#[derive(Default)]
pub struct MemorySessionStore {
    tokens: DashMap<String, RefreshTokenRecord>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_refresh_token(&self, record: &RefreshTokenRecord) -> StoreResult<()> {
        match self.tokens.entry(record.token_hash.clone()) {
            Entry::Occupied(_) => Err(StoreError::Conflict("refresh token already exists".to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get_valid_refresh_token(&self, token: &str) -> StoreResult<RefreshTokenRecord> {
        let now = Utc::now();
        self.tokens
            .get(&RefreshTokenRecord::hash_token(token))
            .filter(|r| r.is_valid_at(now))
            .map(|r| r.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn consume_refresh_token(&self, token: &str) -> StoreResult<RefreshTokenRecord> {
        let now = Utc::now();
        // remove_if holds the shard lock across the check and the removal
        self.tokens
            .remove_if(&RefreshTokenRecord::hash_token(token), |_, r| r.is_valid_at(now))
            .map(|(_, record)| record)
            .ok_or(StoreError::NotFound)
    }

    async fn delete_refresh_token(&self, token: &str) -> StoreResult<()> {
        self.tokens.remove(&RefreshTokenRecord::hash_token(token));
        Ok(())
    }

    async fn delete_refresh_token_by_id(&self, id: Uuid) -> StoreResult<()> {
        self.tokens.retain(|_, r| r.id != id);
        Ok(())
    }

    async fn purge_expired(&self) -> StoreResult<u64> {
        let now = Utc::now();
        let before = self.tokens.len();
        self.tokens.retain(|_, r| r.is_valid_at(now));
        Ok(before.saturating_sub(self.tokens.len()) as u64)
    }
}

/// Carts keyed by owning account
#[derive(Default)]
pub struct MemoryCartStore {
    carts: DashMap<Uuid, Cart>,
}

impl MemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn create_for_account(&self, account_id: Uuid) -> StoreResult<Cart> {
        match self.carts.entry(account_id) {
            Entry::Occupied(_) => Err(StoreError::Conflict("account already has a cart".to_string())),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let cart = Cart {
                    id: Uuid::new_v4(),
                    user_id: account_id,
                    created_at: now,
                    updated_at: now,
                };
                slot.insert(cart.clone());
                Ok(cart)
            }
        }
    }

    async fn find_by_account(&self, account_id: Uuid) -> StoreResult<Cart> {
        self.carts
            .get(&account_id)
            .map(|c| c.value().clone())
            .ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::Role;
    use chrono::Duration;
    use std::sync::Arc;

    fn new_account(email: &str) -> NewAccount {
        NewAccount {
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            phone: String::new(),
            role: Role::Customer,
        }
    }

    #[tokio::test]
    async fn test_account_email_is_unique_and_case_sensitive() {
        let store = MemoryAccountStore::new();
        store.create(new_account("alice@example.com")).await.unwrap();

        assert!(matches!(
            store.create(new_account("alice@example.com")).await,
            Err(StoreError::Conflict(_))
        ));
        assert!(store.create(new_account("Alice@example.com")).await.is_ok());
        assert!(matches!(
            store.find_by_email("ALICE@example.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_find_by_email_active_skips_inactive() {
        let store = MemoryAccountStore::new();
        let mut account = store.create(new_account("alice@example.com")).await.unwrap();
        account.is_active = false;
        store.update(&account).await.unwrap();

        assert!(store.find_by_email("alice@example.com").await.is_ok());
        assert!(matches!(
            store.find_by_email_active("alice@example.com").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let store = MemoryAccountStore::new();
        let account = store.create(new_account("alice@example.com")).await.unwrap();
        let mut ghost = account.clone();
        ghost.id = Uuid::new_v4();
        ghost.email = "ghost@example.com".to_string();

        assert!(matches!(store.update(&ghost).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_duplicate_refresh_token_conflicts() {
        let store = MemorySessionStore::new();
        let record = RefreshTokenRecord::new(Uuid::new_v4(), "token-a", Utc::now() + Duration::hours(1));

        store.create_refresh_token(&record).await.unwrap();
        assert!(matches!(
            store.create_refresh_token(&record).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_expired_record_is_treated_as_absent() {
        let store = MemorySessionStore::new();
        let expired =
            RefreshTokenRecord::new(Uuid::new_v4(), "old", Utc::now() - Duration::seconds(1));
        store.create_refresh_token(&expired).await.unwrap();

        assert!(matches!(store.get_valid_refresh_token("old").await, Err(StoreError::NotFound)));
        assert!(matches!(store.get_valid_refresh_token("never").await, Err(StoreError::NotFound)));
        assert!(matches!(store.consume_refresh_token("old").await, Err(StoreError::NotFound)));
        assert!(matches!(store.consume_refresh_token("never").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_consume_is_single_use() {
        let store = MemorySessionStore::new();
        let record = RefreshTokenRecord::new(Uuid::new_v4(), "once", Utc::now() + Duration::hours(1));
        store.create_refresh_token(&record).await.unwrap();

        let consumed = store.consume_refresh_token("once").await.unwrap();
        assert_eq!(consumed.id, record.id);
        assert!(matches!(store.consume_refresh_token("once").await, Err(StoreError::NotFound)));
        assert!(matches!(store.get_valid_refresh_token("once").await, Err(StoreError::NotFound)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consume_has_one_winner() {
        let store = Arc::new(MemorySessionStore::new());
        let record = RefreshTokenRecord::new(Uuid::new_v4(), "raced", Utc::now() + Duration::hours(1));
        store.create_refresh_token(&record).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.consume_refresh_token("raced").await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_deletes_are_idempotent() {
        let store = MemorySessionStore::new();
        let record = RefreshTokenRecord::new(Uuid::new_v4(), "bye", Utc::now() + Duration::hours(1));
        store.create_refresh_token(&record).await.unwrap();

        store.delete_refresh_token("bye").await.unwrap();
        store.delete_refresh_token("bye").await.unwrap();
        store.delete_refresh_token("never-existed").await.unwrap();
        store.delete_refresh_token_by_id(record.id).await.unwrap();
        store.delete_refresh_token_by_id(Uuid::new_v4()).await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let store = MemorySessionStore::new();
        let record = RefreshTokenRecord::new(Uuid::new_v4(), "by-id", Utc::now() + Duration::hours(1));
        store.create_refresh_token(&record).await.unwrap();

        store.delete_refresh_token_by_id(record.id).await.unwrap();
        assert!(matches!(store.get_valid_refresh_token("by-id").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = MemorySessionStore::new();
        let user = Uuid::new_v4();
        store
            .create_refresh_token(&RefreshTokenRecord::new(user, "a", Utc::now() - Duration::hours(1)))
            .await
            .unwrap();
        store
            .create_refresh_token(&RefreshTokenRecord::new(user, "b", Utc::now() + Duration::hours(1)))
            .await
            .unwrap();

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_one_cart_per_account() {
        let store = MemoryCartStore::new();
        let account_id = Uuid::new_v4();

        let cart = store.create_for_account(account_id).await.unwrap();
        assert_eq!(cart.user_id, account_id);
        assert!(store.create_for_account(account_id).await.is_err());
        assert_eq!(store.find_by_account(account_id).await.unwrap().id, cart.id);
    }
}
