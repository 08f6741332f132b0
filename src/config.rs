//! 配置系统
//! 从环境变量加载所有配置，使用 Secret 包装敏感信息

use config::{Config, ConfigError, Environment};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "0.0.0.0:8080"
    pub addr: String,
    /// Graceful shutdown timeout in seconds
    pub graceful_shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL, kept in a Secret so it never shows up in logs
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// trace, debug, info, warn, error
    pub level: String,
    /// json, pretty
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// HS256 signing secret shared by access and refresh tokens
    pub jwt_secret: Secret<String>,
    /// Access token lifetime (seconds)
    pub access_token_exp_secs: u64,
    /// Refresh token lifetime (seconds)
    pub refresh_token_exp_secs: u64,
    /// Minimum password length in characters. Empty passwords are refused regardless.
    pub password_min_length: usize,
    /// Deadline applied to every store round-trip made by the auth service
    pub store_timeout_ms: u64,
    /// Trim and lower-case emails before lookups. Off by default: lookups follow
    /// the store collation, which is case-sensitive.
    pub normalize_email: bool,
}

impl SecurityConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Buffer size of the in-process auth event bus
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub security: SecurityConfig,
    pub events: EventsConfig,
}

impl AppConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Config::builder();

        settings = settings
            .set_default("server.addr", "0.0.0.0:8080")?
            .set_default("server.graceful_shutdown_timeout_secs", 15)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("database.idle_timeout_secs", 600)?
            .set_default("database.max_lifetime_secs", 1800)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .set_default("security.jwt_secret", "change-this-secret-in-production-min-32-chars!")?
            .set_default("security.access_token_exp_secs", 900)?
            .set_default("security.refresh_token_exp_secs", 604800)?
            .set_default("security.password_min_length", 1)?
            .set_default("security.store_timeout_ms", 5000)?
            .set_default("security.normalize_email", false)?
            .set_default("events.channel_capacity", 1024)?;

        // 前缀为 SHOP_，嵌套字段用 __ 分隔
        settings = settings.add_source(
            Environment::with_prefix("SHOP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = settings.build()?.try_deserialize()?;

        config.validate()?;

        Ok(config)
    }

    /// 验证配置合法性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(port_str) = self.server.addr.split(':').next_back() {
            if let Ok(port) = port_str.parse::<u16>() {
                if port != 0 && port < 1024 {
                    return Err(ConfigError::Message("Server port should be >= 1024".to_string()));
                }
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                    self.logging.level
                )))
            }
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" => {}
            _ => {
                return Err(ConfigError::Message(format!(
                    "Invalid log format: {}. Must be one of: json, pretty",
                    self.logging.format
                )))
            }
        }

        if self.database.max_connections < self.database.min_connections {
            return Err(ConfigError::Message(
                "max_connections must be >= min_connections".to_string(),
            ));
        }

        if self.security.jwt_secret.expose_secret().len() < 32 {
            return Err(ConfigError::Message(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        if self.security.access_token_exp_secs < 60 || self.security.access_token_exp_secs > 86400 {
            return Err(ConfigError::Message(
                "access_token_exp_secs must be between 60 and 86400 (1 minute to 24 hours)"
                    .to_string(),
            ));
        }

        if self.security.refresh_token_exp_secs < 3600
            || self.security.refresh_token_exp_secs > 2592000
        {
            return Err(ConfigError::Message(
                "refresh_token_exp_secs must be between 3600 and 2592000 (1 hour to 30 days)"
                    .to_string(),
            ));
        }

        if self.security.refresh_token_exp_secs <= self.security.access_token_exp_secs {
            return Err(ConfigError::Message(
                "refresh_token_exp_secs must be greater than access_token_exp_secs".to_string(),
            ));
        }

        if self.security.password_min_length < 1 || self.security.password_min_length > 128 {
            return Err(ConfigError::Message(
                "password_min_length must be between 1 and 128".to_string(),
            ));
        }

        if self.security.store_timeout_ms == 0 || self.security.store_timeout_ms > 60_000 {
            return Err(ConfigError::Message(
                "store_timeout_ms must be between 1 and 60000".to_string(),
            ));
        }

        if self.events.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "events.channel_capacity must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
