//! Password hashing and verification using Argon2id

use crate::error::AppError;
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;

const DUMMY_PASSWORD: &str = "timing-equaliser-not-a-real-password";

/// Password hasher with configurable parameters. Clones share the dummy hash,
/// so a clone can be moved onto a blocking thread.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    /// Hash verified against when no account matches. Built with this hasher's
    /// own params so a miss costs the same as a wrong password.
    dummy_hash: Arc<OnceCell<Option<String>>>,
}

impl PasswordHasher {
    /// Create hasher with default parameters (OWASP recommended)
    pub fn new() -> Self {
        // m=19MiB, t=2 iterations, p=1 lane
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default());

        Self {
            argon2,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Create hasher with explicit cost parameters
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| AppError::Config(format!("Invalid Argon2 params: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: Arc::new(OnceCell::new()),
        })
    }

    /// Hash a password. An empty password is rejected, never turned into a usable credential.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.is_empty() {
            return Err(AppError::validation("password must not be empty"));
        }

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored hash. A malformed hash verifies as false.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Failed to parse password hash: {:?}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Burn one verification for a login that matched no account
    pub fn verify_dummy(&self, password: &str) {
        if let Some(hash) = self.dummy_hash() {
            let _ = self.verify(password, hash);
        }
    }

    /// Dummy PHC string, hashed on first use with this hasher's params
    pub fn dummy_hash(&self) -> Option<&str> {
        self.dummy_hash.get_or_init(|| self.hash(DUMMY_PASSWORD).ok()).as_deref()
    }

    /// Validate password against the configured minimum length
    pub fn validate_password_policy(password: &str, min_length: usize) -> Result<(), AppError> {
        if password.is_empty() {
            return Err(AppError::validation("password must not be empty"));
        }

        if password.chars().count() < min_length {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                min_length
            )));
        }

        Ok(())
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
