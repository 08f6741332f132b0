//! 仓库层集成测试（PostgreSQL）
//!
//! 需要数据库：TEST_DATABASE_URL=... cargo test -- --ignored

use chrono::{Duration, Utc};
use serial_test::serial;
use shop_auth::models::{
    session::RefreshTokenRecord,
    user::{NewAccount, Role},
};
use shop_auth::repository::{
    AccountStore, CartStore, PgAccountStore, PgCartStore, PgSessionStore, SessionStore, StoreError,
};
use std::sync::Arc;

mod common;
use common::{create_test_config, setup_test_db};

fn new_account(email: &str) -> NewAccount {
    NewAccount {
        email: email.to_string(),
        password_hash: "$argon2id$v=19$m=1024,t=1,p=1$c2FsdHNhbHQ$aGFzaA".to_string(),
        first_name: "Alice".to_string(),
        last_name: "Liddell".to_string(),
        phone: String::new(),
        role: Role::Customer,
    }
}

#[tokio::test]
#[ignore] // 需要数据库
#[serial]
async fn test_account_store_create_and_find() {
    let pool = setup_test_db(&create_test_config()).await;
    let accounts = PgAccountStore::new(pool.clone());

    let created = accounts.create(new_account("alice@example.com")).await.unwrap();
    assert_eq!(created.role, Role::Customer);
    assert!(created.is_active);

    let by_email = accounts.find_by_email_active("alice@example.com").await.unwrap();
    assert_eq!(by_email.id, created.id);

    let by_id = accounts.find_by_id(created.id).await.unwrap();
    assert_eq!(by_id.email, "alice@example.com");

    // 大小写敏感
    assert!(matches!(
        accounts.find_by_email("Alice@example.com").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
#[ignore] // 需要数据库
#[serial]
async fn test_account_store_duplicate_email_is_conflict() {
    let pool = setup_test_db(&create_test_config()).await;
    let accounts = PgAccountStore::new(pool.clone());

    accounts.create(new_account("alice@example.com")).await.unwrap();
    let duplicate = accounts.create(new_account("alice@example.com")).await;
    assert!(matches!(duplicate, Err(StoreError::Conflict(_))));
}

#[tokio::test]
#[ignore] // 需要数据库
#[serial]
async fn test_account_store_deactivate() {
    let pool = setup_test_db(&create_test_config()).await;
    let accounts = PgAccountStore::new(pool.clone());

    let mut account = accounts.create(new_account("alice@example.com")).await.unwrap();
    account.is_active = false;
    accounts.update(&account).await.unwrap();

    assert!(matches!(
        accounts.find_by_email_active("alice@example.com").await,
        Err(StoreError::NotFound)
    ));
    assert!(accounts.find_by_email("alice@example.com").await.is_ok());
}

#[tokio::test]
#[ignore] // 需要数据库
#[serial]
async fn test_cart_store() {
    let pool = setup_test_db(&create_test_config()).await;
    let account = PgAccountStore::new(pool.clone())
        .create(new_account("alice@example.com"))
        .await
        .unwrap();
    let carts = PgCartStore::new(pool.clone());

    let cart = carts.create_for_account(account.id).await.unwrap();
    assert_eq!(carts.find_by_account(account.id).await.unwrap().id, cart.id);

    // 一个账户一个购物车
    assert!(matches!(
        carts.create_for_account(account.id).await,
        Err(StoreError::Conflict(_))
    ));
}

#[tokio::test]
#[ignore] // 需要数据库
#[serial]
async fn test_session_store_lifecycle() {
    let pool = setup_test_db(&create_test_config()).await;
    let sessions = PgSessionStore::new(pool.clone());
    let user_id = uuid::Uuid::new_v4();

    let record = RefreshTokenRecord::new(user_id, "token-a", Utc::now() + Duration::hours(1));
    sessions.create_refresh_token(&record).await.unwrap();

    assert!(matches!(
        sessions.create_refresh_token(&record).await,
        Err(StoreError::Conflict(_))
    ));

    let found = sessions.get_valid_refresh_token("token-a").await.unwrap();
    assert_eq!(found.user_id, user_id);
    assert_eq!(found.token_hash, RefreshTokenRecord::hash_token("token-a"));

    let consumed = sessions.consume_refresh_token("token-a").await.unwrap();
    assert_eq!(consumed.id, record.id);
    assert!(matches!(
        sessions.consume_refresh_token("token-a").await,
        Err(StoreError::NotFound)
    ));

    sessions.delete_refresh_token("token-a").await.unwrap();
    sessions.delete_refresh_token_by_id(record.id).await.unwrap();
}

#[tokio::test]
#[ignore] // 需要数据库
#[serial]
async fn test_session_store_expired_is_absent() {
    let pool = setup_test_db(&create_test_config()).await;
    let sessions = PgSessionStore::new(pool.clone());

    let expired = RefreshTokenRecord::new(
        uuid::Uuid::new_v4(),
        "token-old",
        Utc::now() - Duration::seconds(1),
    );
    sessions.create_refresh_token(&expired).await.unwrap();

    assert!(matches!(
        sessions.get_valid_refresh_token("token-old").await,
        Err(StoreError::NotFound)
    ));
    assert!(matches!(
        sessions.consume_refresh_token("token-old").await,
        Err(StoreError::NotFound)
    ));

    assert_eq!(sessions.purge_expired().await.unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore] // 需要数据库
#[serial]
async fn test_session_store_concurrent_consume() {
    let pool = setup_test_db(&create_test_config()).await;
    let sessions = Arc::new(PgSessionStore::new(pool.clone()));

    let record = RefreshTokenRecord::new(
        uuid::Uuid::new_v4(),
        "token-race",
        Utc::now() + Duration::hours(1),
    );
    sessions.create_refresh_token(&record).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let sessions = sessions.clone();
        handles.push(tokio::spawn(async move {
            sessions.consume_refresh_token("token-race").await
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
