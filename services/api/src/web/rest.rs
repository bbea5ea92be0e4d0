//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the roster, biography, and progress-reset
//! endpoints, and the master definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use mythquest_core::domain::{BioForm, Character, CharacterBio};
use mythquest_core::unlock::character_status;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::signup_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        list_characters_handler,
        get_character_handler,
        get_biography_handler,
        reset_progress_handler,
        crate::web::quiz::start_quiz_handler,
        crate::web::quiz::get_quiz_handler,
        crate::web::quiz::answer_handler,
        crate::web::quiz::advance_handler,
        crate::web::quiz::retry_handler,
        crate::web::chat::open_chat_handler,
        crate::web::chat::send_chat_handler,
    ),
    components(schemas(
        crate::web::auth::SignupRequest,
        crate::web::auth::LoginRequest,
        crate::web::auth::AuthResponse,
        CharacterSummary,
        CharacterDetail,
        BiographyResponse,
        BiographySectionView,
        crate::web::quiz::AnswerRequest,
        crate::web::quiz::QuizView,
        crate::web::chat::SendChatRequest,
        crate::web::chat::ChatMessageView,
        crate::web::chat::ChatTranscriptView,
    )),
    tags(
        (name = "MythQuest API", description = "API endpoints for the Mahabharata quest, quiz, and character chat experience.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One roster entry with the signed-in user's progress against it.
#[derive(Serialize, ToSchema)]
pub struct CharacterSummary {
    pub id: String,
    pub name: String,
    pub short_bio: String,
    pub completed_levels: u32,
    pub total_levels: u32,
    pub reward_unlocked: bool,
}

/// Full selection-screen detail for one character.
#[derive(Serialize, ToSchema)]
pub struct CharacterDetail {
    pub id: String,
    pub name: String,
    pub short_bio: String,
    pub skills: Vec<String>,
    pub traits: Vec<String>,
    pub completed_levels: u32,
    pub total_levels: u32,
    pub reward_unlocked: bool,
}

#[derive(Serialize, ToSchema)]
pub struct BiographySectionView {
    pub title: String,
    pub content: String,
}

#[derive(Serialize, ToSchema)]
pub struct BiographyResponse {
    pub name: String,
    pub short_description: String,
    pub skills: Vec<String>,
    pub traits: Vec<String>,
    pub full_biography: Vec<BiographySectionView>,
}

impl From<CharacterBio> for BiographyResponse {
    fn from(bio: CharacterBio) -> Self {
        Self {
            name: bio.name,
            short_description: bio.short_description,
            skills: bio.skills,
            traits: bio.traits,
            full_biography: bio
                .full_biography
                .into_iter()
                .map(|s| BiographySectionView {
                    title: s.title,
                    content: s.content,
                })
                .collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct BiographyQuery {
    /// Which rendition to fetch: "short" (default) or "full".
    pub form: Option<String>,
}

//=========================================================================================
// Shared Helpers
//=========================================================================================

/// Resolves a roster character or turns the miss into a 404.
pub(crate) fn require_character<'a>(
    state: &'a AppState,
    character_id: &str,
) -> Result<&'a Character, (StatusCode, String)> {
    state.catalog.character(character_id).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            format!("Unknown character '{character_id}'"),
        )
    })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the character roster with the signed-in user's progress.
#[utoipa::path(
    get,
    path = "/characters",
    responses(
        (status = 200, description = "The character roster", body = [CharacterSummary]),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn list_characters_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Json<Vec<CharacterSummary>> {
    let ledger = state.progress.load(user_id).await;
    let roster = state
        .catalog
        .roster()
        .iter()
        .map(|character| {
            let status = character_status(&ledger, character);
            CharacterSummary {
                id: character.id.clone(),
                name: character.name.clone(),
                short_bio: character.short_bio.clone(),
                completed_levels: status.completed_levels,
                total_levels: status.total_levels,
                reward_unlocked: status.reward_unlocked,
            }
        })
        .collect();
    Json(roster)
}

/// Fetch one character's selection-screen detail.
#[utoipa::path(
    get,
    path = "/characters/{character_id}",
    responses(
        (status = 200, description = "Character detail", body = CharacterDetail),
        (status = 404, description = "Unknown character")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn get_character_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
) -> Result<Json<CharacterDetail>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    let ledger = state.progress.load(user_id).await;
    let status = character_status(&ledger, character);

    Ok(Json(CharacterDetail {
        id: character.id.clone(),
        name: character.name.clone(),
        short_bio: character.short_bio.clone(),
        skills: character.skills.clone(),
        traits: character.traits.clone(),
        completed_levels: status.completed_levels,
        total_levels: status.total_levels,
        reward_unlocked: status.reward_unlocked,
    }))
}

/// Fetch a character's biography. The full rendition stays behind the
/// reward gate until every quiz level is complete.
#[utoipa::path(
    get,
    path = "/characters/{character_id}/biography",
    responses(
        (status = 200, description = "The requested biography", body = BiographyResponse),
        (status = 400, description = "Unknown biography form"),
        (status = 403, description = "The full biography is still locked"),
        (status = 404, description = "Unknown character")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id."),
        ("form" = Option<String>, Query, description = "Which rendition to fetch: 'short' (default) or 'full'.")
    )
)]
pub async fn get_biography_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
    Query(query): Query<BiographyQuery>,
) -> Result<Json<BiographyResponse>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;

    let form = match query.form.as_deref() {
        None | Some("short") => BioForm::Short,
        Some("full") => BioForm::Full,
        Some(other) => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown biography form '{other}'"),
            ))
        }
    };

    // The gate is enforced here, not in the client.
    if form == BioForm::Full {
        let ledger = state.progress.load(user_id).await;
        if !character_status(&ledger, character).reward_unlocked {
            return Err((
                StatusCode::FORBIDDEN,
                format!(
                    "The full biography unlocks after completing all {} levels",
                    character.total_levels
                ),
            ));
        }
    }

    // Missing or unreadable biography content degrades to the roster
    // summary instead of failing the request.
    let bio = match state.catalog.biography(&character_id, form).await {
        Ok(bio) => bio,
        Err(e) => {
            warn!("biography unavailable for '{character_id}': {e}; serving the roster summary");
            CharacterBio {
                name: character.name.clone(),
                short_description: character.short_bio.clone(),
                skills: character.skills.clone(),
                traits: character.traits.clone(),
                full_biography: Vec::new(),
            }
        }
    };

    Ok(Json(BiographyResponse::from(bio)))
}

/// Wipe the signed-in user's progress and chat history.
#[utoipa::path(
    post,
    path = "/progress/reset",
    responses(
        (status = 204, description = "Progress reset"),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn reset_progress_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // Drop any live quiz attempts; their target levels are stale now.
    state
        .quiz_attempts
        .lock()
        .await
        .retain(|(owner, _), _| *owner != user_id);

    state.progress.reset(user_id).await.map_err(|e| {
        error!("Failed to reset progress for {user_id}: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to reset progress".to_string(),
        )
    })?;

    Ok(StatusCode::NO_CONTENT)
}
