//! 认证服务：注册、登录、令牌刷新、登出

use crate::{
    auth::{jwt::JwtService, password::PasswordHasher},
    config::SecurityConfig,
    error::{AppError, Result},
    events::{AuthEvent, EventPublisher},
    models::{
        auth::{AuthResponse, LoginRequest, RegisterRequest},
        session::RefreshTokenRecord,
        user::{Account, NewAccount, Role, UserResponse},
    },
    repository::{StoreError, StoreResult, Stores},
};
use std::{future::Future, sync::Arc, time::Duration};
use uuid::Uuid;
use validator::Validate;

const TOKEN_TYPE: &str = "Bearer";

pub struct AuthService {
    stores: Stores,
    publisher: Arc<dyn EventPublisher>,
    jwt_service: Arc<JwtService>,
    hasher: PasswordHasher,
    password_min_length: usize,
    normalize_email: bool,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        stores: Stores,
        publisher: Arc<dyn EventPublisher>,
        jwt_service: Arc<JwtService>,
        config: &SecurityConfig,
    ) -> Self {
        Self {
            stores,
            publisher,
            jwt_service,
            hasher: PasswordHasher::new(),
            password_min_length: config.password_min_length,
            normalize_email: config.normalize_email,
            store_timeout: config.store_timeout(),
        }
    }

    /// Swap the Argon2 cost parameters
    pub fn with_password_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    /// 用户注册
    pub async fn register(&self, mut req: RegisterRequest) -> Result<AuthResponse> {
        req.email = self.normalize(&req.email);
        req.validate()?;
        PasswordHasher::validate_password_policy(&req.password, self.password_min_length)?;

        match self
            .within("find_by_email_active", self.stores.accounts.find_by_email_active(&req.email))
            .await
        {
            Ok(_) => return Err(AppError::AlreadyRegistered),
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }

        let password_hash = self.hash_password(req.password).await?;

        let new_account = NewAccount {
            email: req.email,
            password_hash,
            first_name: req.first_name,
            last_name: req.last_name,
            phone: req.phone,
            role: Role::Customer,
        };

        // a unique violation here is a concurrent registration or an inactive holder of the email
        let account = match self
            .within("create_account", self.stores.accounts.create(new_account))
            .await
        {
            Ok(account) => account,
            Err(StoreError::Conflict(_)) => return Err(AppError::AlreadyRegistered),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self
            .within("create_cart", self.stores.carts.create_for_account(account.id))
            .await
        {
            tracing::warn!(account_id = %account.id, error = %e, "Failed to create cart for new account");
        }

        tracing::info!(account_id = %account.id, "Account registered");
        metrics::counter!("auth.register.success").increment(1);

        self.issue_session(&account, "register").await
    }

    /// 用户登录
    pub async fn login(&self, mut req: LoginRequest) -> Result<AuthResponse> {
        req.email = self.normalize(&req.email);
        req.validate()?;

        let account = match self
            .within("find_by_email_active", self.stores.accounts.find_by_email_active(&req.email))
            .await
        {
            Ok(account) => Some(account),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        let verified = self.verify_password(req.password, stored_hash).await?;

        match account {
            Some(account) if verified => {
                metrics::counter!("auth.login.success").increment(1);
                self.issue_session(&account, "login").await
            }
            _ => {
                tracing::debug!("Login rejected");
                metrics::counter!("auth.login.failure").increment(1);
                Err(AppError::InvalidCredentials)
            }
        }
    }

    /// 刷新令牌（单次使用，轮换）
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthResponse> {
        let claims = self
            .jwt_service
            .validate_refresh_token(refresh_token)
            .map_err(|e| {
                tracing::debug!(reason = %e, "Refresh token rejected by codec");
                metrics::counter!("auth.refresh.rejected").increment(1);
                AppError::InvalidToken
            })?;
        let account_id = claims.account_id().map_err(|_| AppError::InvalidToken)?;

        let record = match self
            .within("consume_refresh_token", self.stores.sessions.consume_refresh_token(refresh_token))
            .await
        {
            Ok(record) => record,
            Err(StoreError::NotFound) => {
                tracing::debug!(%account_id, "Refresh token absent, expired or already used");
                metrics::counter!("auth.refresh.rejected").increment(1);
                return Err(AppError::InvalidToken);
            }
            Err(e) => return Err(e.into()),
        };

        if record.user_id != account_id {
            tracing::warn!(
                %account_id,
                record_account_id = %record.user_id,
                "Refresh token subject does not match its record"
            );
            return Err(AppError::InvalidToken);
        }

        let account = match self
            .within("find_by_id", self.stores.accounts.find_by_id(record.user_id))
            .await
        {
            Ok(account) if account.is_active => account,
            Ok(_) | Err(StoreError::NotFound) => return Err(AppError::AccountNotFound),
            Err(e) => return Err(e.into()),
        };

        metrics::counter!("auth.refresh.success").increment(1);
        self.issue_session(&account, "refresh").await
    }

    /// 登出（幂等）
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.within("delete_refresh_token", self.stores.sessions.delete_refresh_token(refresh_token))
            .await?;

        metrics::counter!("auth.logout").increment(1);
        Ok(())
    }

    /// Account summary for an authenticated caller or an admin lookup
    pub async fn get_account(&self, account_id: Uuid) -> Result<UserResponse> {
        match self
            .within("find_by_id", self.stores.accounts.find_by_id(account_id))
            .await
        {
            Ok(account) => Ok(UserResponse::from(&account)),
            Err(StoreError::NotFound) => Err(AppError::AccountNotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Issue a pair, persist its refresh half, then publish. A publish failure
    /// fails the call even though the record is already stored.
    async fn issue_session(&self, account: &Account, trigger: &'static str) -> Result<AuthResponse> {
        let pair = self
            .jwt_service
            .generate_token_pair(&account.id, &account.email, account.role)?;

        let record = RefreshTokenRecord::new(account.id, &pair.refresh_token, pair.refresh_expires_at);
        self.within("create_refresh_token", self.stores.sessions.create_refresh_token(&record))
            .await?;

        let event = AuthEvent::user_logged_in(account.id, &account.email, trigger);
        if let Err(e) = self.publisher.publish(event).await {
            tracing::error!(account_id = %account.id, trigger, error = %e, "Failed to publish auth event");
            metrics::counter!("auth.event.publish_failed").increment(1);
            return Err(AppError::EventPublishFailed(e.to_string()));
        }

        tracing::info!(account_id = %account.id, trigger, "Session issued");

        Ok(AuthResponse {
            user: UserResponse::from(account),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
            token_type: TOKEN_TYPE.to_string(),
        })
    }

    /// Bound a store call by the configured deadline
    async fn within<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.store_timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(op, timeout_ms = self.store_timeout.as_millis() as u64, "Store call timed out");
                Err(StoreError::Unavailable(format!("{} timed out", op)))
            }
        }
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("hashing task failed: {}", e)))?
    }

    /// With no stored hash a dummy verification still runs
    async fn verify_password(&self, password: String, hash: Option<String>) -> Result<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || match hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => {
                hasher.verify_dummy(&password);
                false
            }
        })
        .await
        .map_err(|e| AppError::Internal(format!("verification task failed: {}", e)))
    }

    fn normalize(&self, email: &str) -> String {
        if self.normalize_email {
            email.trim().to_lowercase()
        } else {
            email.to_string()
        }
    }
}
