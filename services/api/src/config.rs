//! services/api/src/config.rs
//!
//! Runtime configuration, read once from the environment at startup. A `.env`
//! file is honored for local development; secrets never get read anywhere
//! else in the crate, they are injected into adapters from here.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("The environment variable {0} is not set")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Everything the binaries need from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub content_dir: PathBuf,
    pub openai_api_key: Option<String>,
    pub chat_model: String,
    pub allowed_origin: String,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// development defaults for everything but `DATABASE_URL`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Tests stay hermetic; only real runs read the .env file.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address = env_or("BIND_ADDRESS", "0.0.0.0:3000")
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = env_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let content_dir = PathBuf::from(env_or("CONTENT_DIR", "./content"));

        // Absent key means the reply adapter runs in fallback-only mode.
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let chat_model = env_or("CHAT_MODEL", "gpt-4o-mini");

        let allowed_origin = env_or("ALLOWED_ORIGIN", "http://localhost:3000");

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            content_dir,
            openai_api_key,
            chat_model,
            allowed_origin,
        })
    }
}
