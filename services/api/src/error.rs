//! services/api/src/error.rs
//!
//! The service-wide error type. Handlers answer with plain status tuples;
//! this enum covers startup and everything behind the ports.

use crate::config::ConfigError;
use mythquest_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error that surfaced through one of the core service ports.
    #[error("Service port error: {0}")]
    Port(#[from] PortError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Socket binding, content reads, the OpenAPI file dump.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
