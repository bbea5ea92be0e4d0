//! crates/mythquest_core/src/ports.rs
//!
//! The traits the game logic talks through. Everything external sits on the
//! far side of one of these: persistence, authored content, reply generation,
//! and identity. The api crate provides the real implementations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{BioForm, Character, CharacterBio, ChatRole, Question, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// The one error type every port speaks. Adapters fold their library errors
/// into these four cases; callers never see a sqlx or HTTP error directly.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid request: {0}")]
    Invalid(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Per-user key/value persistence for game state: the progress ledger and the
/// chat transcripts. Values are opaque JSON documents; a write replaces the
/// whole value and the last write wins. No transactions, no versioning.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn read(&self, user_id: Uuid, key: &str) -> PortResult<Option<Value>>;

    async fn write(&self, user_id: Uuid, key: &str, value: Value) -> PortResult<()>;

    async fn remove(&self, user_id: Uuid, key: &str) -> PortResult<()>;

    /// Removes every key held for the user. Backs the full progress reset.
    async fn clear(&self, user_id: Uuid) -> PortResult<()>;
}

/// Read-only access to authored game content: the character roster, the
/// leveled question banks, and the biography documents.
///
/// Lookups resolve through an explicit registry keyed by character id, so a
/// miss is a definite `NotFound` rather than a failed path guess.
#[async_trait]
pub trait ContentCatalog: Send + Sync {
    fn roster(&self) -> &[Character];

    fn character(&self, character_id: &str) -> Option<&Character>;

    /// Every question authored for the character, across all levels.
    async fn questions(&self, character_id: &str) -> PortResult<Vec<Question>>;

    async fn biography(&self, character_id: &str, form: BioForm) -> PortResult<CharacterBio>;
}

/// One prior exchange handed to the reply generator as context.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// Produces an in-character reply to a user message. Callers cap `history`
/// at the context window; any failure is recovered locally with a fixed
/// fallback line, so implementations just report what went wrong.
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(
        &self,
        character_id: &str,
        message: &str,
        history: &[ChatTurn],
    ) -> PortResult<String>;
}

/// Account and login-session storage backing the auth layer.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn create_user_with_email(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> PortResult<User>;

    async fn get_user_by_email(&self, email: &str) -> PortResult<UserCredentials>;

    async fn create_auth_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> PortResult<()>;

    async fn validate_auth_session(&self, session_id: &str) -> PortResult<Uuid>;

    async fn delete_auth_session(&self, session_id: &str) -> PortResult<()>;
}
