//! crates/mythquest_core/src/domain.rs
//!
//! The plain data types the rest of the workspace is written in terms of,
//! free of any database or framework. The game-state types derive serde
//! because ledgers and transcripts are persisted as JSON documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A playable character from the Mahabharata roster.
///
/// Loaded once from the content catalog at startup and never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub short_bio: String,
    pub skills: Vec<String>,
    pub traits: Vec<String>,
    /// Opening line of a fresh chat session with this character.
    pub greeting: String,
    /// Persona notes woven into the reply generator's system prompt.
    pub personality: String,
    pub response_style: String,
    pub total_levels: u32,
}

/// A single quiz question. `correct_answer` indexes into `options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub level: u32,
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: String,
}

/// Who authored a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Character,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid, // v7, so ids sort in send order
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// The full transcript between one user and one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub character_id: String,
    pub messages: Vec<ChatMessage>,
    pub last_updated: DateTime<Utc>,
}

/// One titled passage of a character's long-form biography.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BiographySection {
    pub title: String,
    pub content: String,
}

/// A biography document as served to the client. The short form ships with
/// the roster view; the full form stays behind the reward gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterBio {
    pub name: String,
    pub short_description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub traits: Vec<String>,
    #[serde(default)]
    pub full_biography: Vec<BiographySection>,
}

/// Which rendition of a biography to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BioForm {
    Short,
    Full,
}

/// A signed-up account, as handlers see it.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
}

/// Account plus password hash. Never leaves the auth layer.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub hashed_password: String,
}

/// A browser login session, named by the opaque id in the session cookie.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub id: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}
