//! Application settings and configuration structures.

use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// JWT verification settings
    pub jwt: JwtSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Chat subsystem configuration
    pub chat: ChatSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,

    /// Apply embedded migrations on startup
    pub run_migrations: bool,
}

/// JWT configuration. Tokens are issued by the forum's login endpoint with the
/// same shared secret.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying (and, in tooling, signing) tokens
    pub secret: String,

    /// Lifetime of tokens minted by `TokenVerifier::issue`, in hours
    pub token_expiry_hours: i64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// Allowed origins (comma-separated in env)
    pub allowed_origins: Vec<String>,
}

/// Chat subsystem configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatSettings {
    /// Number of messages replayed to a newly connected session
    pub history_limit: i64,

    /// Interval between protocol-level pings, in seconds
    pub ping_interval_secs: u64,

    /// Read deadline, refreshed on every inbound frame, in seconds
    pub read_deadline_secs: u64,

    /// Maximum message size in bytes
    pub max_message_size: usize,

    /// Maximum frame size in bytes
    pub max_frame_size: usize,

    /// Maximum content length in characters
    pub max_content_length: usize,

    /// How long shutdown waits for live sessions to drain, in seconds
    pub shutdown_grace_secs: u64,

    /// Frames queued per connection before a slow reader is evicted
    pub send_queue_capacity: usize,

    /// A single socket write taking longer than this closes the session, in seconds
    pub write_timeout_secs: u64,
}

/// Minimum required length for JWT secret (256 bits = 32 bytes)
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

impl Settings {
    /// Load settings from environment variables and configuration files.
    ///
    /// The loading order is:
    /// 1. built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the resulting settings fail validation.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("database.max_connections", 25)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("database.run_migrations", true)?
            .set_default("jwt.token_expiry_hours", 24)?
            .set_default("cors.allowed_origins", Vec::<String>::new())?
            .set_default("chat.history_limit", 50)?
            .set_default("chat.ping_interval_secs", 30)?
            .set_default("chat.read_deadline_secs", 60)?
            .set_default("chat.max_message_size", 65536_i64)? // 64KB
            .set_default("chat.max_frame_size", 16384_i64)? // 16KB
            .set_default("chat.max_content_length", 4000)?
            .set_default("chat.shutdown_grace_secs", 5)?
            .set_default("chat.send_queue_capacity", 256)?
            .set_default("chat.write_timeout_secs", 10)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__CHAT__HISTORY_LIMIT=20 -> chat.history_limit = 20
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("jwt.secret", std::env::var("JWT_SECRET").ok())?
            .build()?
            .try_deserialize()
            .and_then(|settings: Self| {
                settings.validate()?;
                Ok(settings)
            })
    }

    /// Check cross-field invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least {} characters for security. Current length: {}",
                MIN_JWT_SECRET_LENGTH,
                self.jwt.secret.len()
            )));
        }
        self.chat.validate()
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl ChatSettings {
    /// A peer that answers every ping must never hit the read deadline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ping_interval_secs == 0 || self.ping_interval_secs >= self.read_deadline_secs {
            return Err(ConfigError::Message(format!(
                "chat.ping_interval_secs ({}) must be non-zero and shorter than chat.read_deadline_secs ({})",
                self.ping_interval_secs, self.read_deadline_secs
            )));
        }
        if self.send_queue_capacity == 0 || self.write_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "chat.send_queue_capacity and chat.write_timeout_secs must be non-zero".into(),
            ));
        }
        if self.history_limit < 0 {
            return Err(ConfigError::Message(
                "chat.history_limit must not be negative".into(),
            ));
        }
        Ok(())
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            ping_interval_secs: 30,
            read_deadline_secs: 60,
            max_message_size: 65536,
            max_frame_size: 16384,
            max_content_length: 4000,
            shutdown_grace_secs: 5,
            send_queue_capacity: 256,
            write_timeout_secs: 10,
        }
    }
}
