//! services/api/src/web/chat.rs
//!
//! Axum handlers for character chat. Both endpoints sit behind the reward
//! gate: a character talks only to users who have completed every level.

use crate::web::rest::require_character;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use mythquest_core::domain::{Character, ChatMessage, ChatRole, ChatSession};
use mythquest_core::unlock::character_status;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SendChatRequest {
    pub message: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatMessageView {
    pub id: Uuid,
    /// "user" or "character".
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&ChatMessage> for ChatMessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            role: match message.role {
                ChatRole::User => "user",
                ChatRole::Character => "character",
            }
            .to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ChatTranscriptView {
    pub character_id: String,
    pub messages: Vec<ChatMessageView>,
    pub last_updated: DateTime<Utc>,
}

impl From<&ChatSession> for ChatTranscriptView {
    fn from(session: &ChatSession) -> Self {
        Self {
            character_id: session.character_id.clone(),
            messages: session.messages.iter().map(ChatMessageView::from).collect(),
            last_updated: session.last_updated,
        }
    }
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

async fn require_unlocked(
    state: &AppState,
    user_id: Uuid,
    character: &Character,
) -> Result<(), (StatusCode, String)> {
    let ledger = state.progress.load(user_id).await;
    if character_status(&ledger, character).reward_unlocked {
        Ok(())
    } else {
        Err((
            StatusCode::FORBIDDEN,
            format!(
                "Chat with {} unlocks after completing all {} levels",
                character.name, character.total_levels
            ),
        ))
    }
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

/// Fetch the chat transcript, creating a greeting-only session on first
/// contact.
#[utoipa::path(
    get,
    path = "/characters/{character_id}/chat",
    responses(
        (status = 200, description = "The chat transcript", body = ChatTranscriptView),
        (status = 403, description = "Chat with this character is still locked"),
        (status = 404, description = "Unknown character"),
        (status = 500, description = "The transcript could not be loaded or saved")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn open_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
) -> Result<Json<ChatTranscriptView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    require_unlocked(&state, user_id, character).await?;

    let session = state
        .chat
        .open_session(user_id, &character_id)
        .await
        .map_err(|e| {
            error!("Failed to open the chat with '{character_id}': {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to open the chat session".to_string(),
            )
        })?;

    Ok(Json(ChatTranscriptView::from(&session)))
}

/// Send a message to the character and receive the updated transcript. The
/// reply is the character's generated line, or a fixed apology when
/// generation fails.
#[utoipa::path(
    post,
    path = "/characters/{character_id}/chat",
    request_body = SendChatRequest,
    responses(
        (status = 200, description = "The transcript with the new exchange", body = ChatTranscriptView),
        (status = 400, description = "The message was empty"),
        (status = 403, description = "Chat with this character is still locked"),
        (status = 404, description = "Unknown character"),
        (status = 500, description = "The transcript could not be saved")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn send_chat_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
    Json(payload): Json<SendChatRequest>,
) -> Result<Json<ChatTranscriptView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    require_unlocked(&state, user_id, character).await?;

    let message = payload.message.trim();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Message cannot be empty".to_string(),
        ));
    }

    let session = state
        .chat
        .send_message(user_id, &character_id, message)
        .await
        .map_err(|e| {
            error!("Failed to send a chat message to '{character_id}': {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to send the message".to_string(),
            )
        })?;

    Ok(Json(ChatTranscriptView::from(&session)))
}
