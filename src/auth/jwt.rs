//! JWT token generation and validation
//! Implements access token + refresh token pattern

use crate::{config::SecurityConfig, error::AppError, models::user::Role};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// Why a token was rejected
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token signature does not verify")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Access token claims. This is the contract every authentication middleware reads.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    /// JWT ID (unique token identifier)
    pub jti: String,
}

/// Refresh token claims. Role is left out so a stale role cannot ride a refresh.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: String,
    pub token_type: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl RefreshClaims {
    pub fn account_id(&self) -> Result<Uuid, TokenError> {
        Uuid::parse_str(&self.sub).map_err(|_| TokenError::Malformed)
    }
}

/// Token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// seconds until access token expires
    pub expires_in: u64,
    pub refresh_expires_at: DateTime<Utc>,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_exp_secs: u64,
    refresh_token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::new(
            config.jwt_secret.expose_secret(),
            config.access_token_exp_secs,
            config.refresh_token_exp_secs,
        )
    }

    pub fn new(
        secret: &str,
        access_token_exp_secs: u64,
        refresh_token_exp_secs: u64,
    ) -> Result<Self, AppError> {
        // HS256 wants at least 32 bytes of key
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_exp_secs,
            refresh_token_exp_secs,
        })
    }

    pub fn access_token_exp_secs(&self) -> u64 {
        self.access_token_exp_secs
    }

    /// Generate access token
    pub fn generate_access_token(
        &self,
        account_id: &Uuid,
        email: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let claims = Claims {
            sub: account_id.to_string(),
            email: email.to_string(),
            role,
            token_type: ACCESS.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.access_token_exp_secs as i64)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        self.sign(&claims)
    }

    /// Generate refresh token, returning it with its expiry
    pub fn generate_refresh_token(
        &self,
        account_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<(String, DateTime<Utc>), AppError> {
        let expires_at = now + Duration::seconds(self.refresh_token_exp_secs as i64);

        let claims = RefreshClaims {
            sub: account_id.to_string(),
            token_type: REFRESH.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok((self.sign(&claims)?, expires_at))
    }

    /// Generate token pair
    pub fn generate_token_pair(
        &self,
        account_id: &Uuid,
        email: &str,
        role: Role,
    ) -> Result<TokenPair, AppError> {
        let now = Utc::now();
        let access_token = self.generate_access_token(account_id, email, role, now)?;
        let (refresh_token, refresh_expires_at) = self.generate_refresh_token(account_id, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_token_exp_secs,
            refresh_expires_at,
        })
    }

    /// Validate access token specifically
    pub fn validate_access_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.token_type != ACCESS {
            tracing::debug!("Token type mismatch: expected 'access', got '{}'", claims.token_type);
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }

    /// Validate refresh token specifically
    pub fn validate_refresh_token(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims = decode::<RefreshClaims>(token, &self.decoding_key, &self.validation)?.claims;

        if claims.token_type != REFRESH {
            tracing::debug!("Token type mismatch: expected 'refresh', got '{}'", claims.token_type);
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }
}
