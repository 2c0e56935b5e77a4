//! # configs
//!
//! Layered runtime configuration for civic-board.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults (see [`Settings::builder`])
//! 2. `config/default.toml` in the working directory (optional)
//! 3. The file named by `CIVIC_CONFIG` (optional)
//! 4. `CIVIC__<SECTION>__<KEY>` environment variables, e.g. `CIVIC__AUTH__JWT_SECRET`
//!
//! A `.env` file is read first so its entries behave like real environment
//! variables.

use std::path::PathBuf;

use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

/// Shortest accepted HMAC secret, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 16;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    pub auth: AuthSettings,
    pub database: DatabaseSettings,
    pub media: MediaSettings,
    pub log: LogSettings,
}

#[derive(Debug, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for any request body, uploads included.
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: SecretString,
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    pub url: Option<SecretString>,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaBackend {
    Local,
    Cloudinary,
}

#[derive(Debug, Deserialize)]
pub struct MediaSettings {
    pub backend: MediaBackend,
    /// Directory the local backend writes into.
    pub local_root: PathBuf,
    /// URL prefix under which `local_root` is served.
    pub public_url_prefix: String,
    pub cloudinary: Option<CloudinarySettings>,
}

#[derive(Debug, Deserialize)]
pub struct CloudinarySettings {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Settings {
    /// Builder preloaded with defaults for everything except secrets.
    pub fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.max_body_bytes", 10 * 1024 * 1024)?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("database.backend", "memory")?
            .set_default("database.max_connections", 10)?
            .set_default("media.backend", "local")?
            .set_default("media.local_root", "./data/uploads")?
            .set_default("media.public_url_prefix", "/uploads")?
            .set_default("log.level", "info")?
            .set_default("log.json", false)?)
    }

    /// Loads and validates settings from every source listed in the module docs.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, ".env file present but unreadable");
            }
        }

        let mut builder = Self::builder()?
            .add_source(File::with_name("config/default").required(false));

        if let Ok(path) = std::env::var("CIVIC_CONFIG") {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("CIVIC")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Parses settings from a TOML document layered over the defaults.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Self::builder()?
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Cross-field checks `serde` cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.jwt_secret.expose_secret().len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid(format!(
                "auth.jwt_secret must be at least {MIN_JWT_SECRET_LEN} bytes"
            )));
        }
        if self.auth.token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid(
                "auth.token_ttl_secs must be positive".to_string(),
            ));
        }
        if self.database.backend == DatabaseBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Invalid(
                "database.url is required for the postgres backend".to_string(),
            ));
        }
        if self.media.backend == MediaBackend::Cloudinary && self.media.cloudinary.is_none() {
            return Err(ConfigError::Invalid(
                "media.cloudinary is required for the cloudinary backend".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
