//! services/api/src/web/quiz.rs
//!
//! Axum handlers for the leveled quiz loop. Each signed-in user gets at most
//! one live attempt per character, held in [`AppState::quiz_attempts`]; every
//! handler answers with the attempt's current screen as a `QuizView`.

use crate::web::rest::require_character;
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use mythquest_core::domain::Character;
use mythquest_core::ports::PortError;
use mythquest_core::quiz::{AnswerOutcome, QuizEngine, QuizStage};
use mythquest_core::unlock::reward_unlocked;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct AnswerRequest {
    /// Zero-based index into the current question's options.
    pub answer_index: usize,
}

/// The quiz screen a client should render, tagged by `phase`.
#[derive(Serialize, ToSchema)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum QuizView {
    /// A question is open and waiting for its first answer.
    Answering {
        level: u32,
        question_number: usize,
        total_questions: usize,
        score: usize,
        prompt: String,
        options: Vec<String>,
    },
    /// The current question is answered; show the explanation until the
    /// client advances.
    Explaining {
        level: u32,
        question_number: usize,
        total_questions: usize,
        score: usize,
        prompt: String,
        options: Vec<String>,
        selected_answer: usize,
        correct_answer: usize,
        was_correct: bool,
        explanation: String,
        last_question: bool,
    },
    /// The level was passed and progress saved; advancing continues onward.
    LevelComplete {
        level: u32,
        score: usize,
        total_questions: usize,
        quest_complete: bool,
    },
    LevelFailed {
        level: u32,
        score: usize,
        required: usize,
        total_questions: usize,
    },
    AllLevelsComplete {
        completed_levels: u32,
        total_levels: u32,
        reward_unlocked: bool,
    },
    ContentUnavailable,
}

fn quiz_view(character: &Character, stage: &QuizStage) -> QuizView {
    match stage {
        QuizStage::Answering(round) => {
            let question = round.current_question();
            match round.selected_answer() {
                None => QuizView::Answering {
                    level: round.level(),
                    question_number: round.question_number(),
                    total_questions: round.total_questions(),
                    score: round.score(),
                    prompt: question.prompt.clone(),
                    options: question.options.clone(),
                },
                Some(selected) => QuizView::Explaining {
                    level: round.level(),
                    question_number: round.question_number(),
                    total_questions: round.total_questions(),
                    score: round.score(),
                    prompt: question.prompt.clone(),
                    options: question.options.clone(),
                    selected_answer: selected,
                    correct_answer: question.correct_answer,
                    was_correct: selected == question.correct_answer,
                    explanation: question.explanation.clone(),
                    last_question: round.is_last_question(),
                },
            }
        }
        QuizStage::LevelComplete { level, score, total } => QuizView::LevelComplete {
            level: *level,
            score: *score,
            total_questions: *total,
            quest_complete: *level >= character.total_levels,
        },
        QuizStage::LevelFailed {
            level,
            score,
            required,
            total,
        } => QuizView::LevelFailed {
            level: *level,
            score: *score,
            required: *required,
            total_questions: *total,
        },
        QuizStage::AllLevelsComplete { completed_levels } => QuizView::AllLevelsComplete {
            completed_levels: *completed_levels,
            total_levels: character.total_levels,
            reward_unlocked: reward_unlocked(*completed_levels, character.total_levels),
        },
        QuizStage::ContentUnavailable => QuizView::ContentUnavailable,
    }
}

//=========================================================================================
// Quiz Handlers
//=========================================================================================

/// Start (or restart) a quiz attempt at the user's next uncompleted level.
#[utoipa::path(
    post,
    path = "/characters/{character_id}/quiz",
    responses(
        (status = 200, description = "The opening quiz screen", body = QuizView),
        (status = 404, description = "Unknown character")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn start_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
) -> Result<Json<QuizView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    let engine = QuizEngine::start(
        state.catalog.clone(),
        state.progress.clone(),
        user_id,
        &character_id,
    )
    .await;
    let view = quiz_view(character, engine.stage());
    state
        .quiz_attempts
        .lock()
        .await
        .insert((user_id, character_id), engine);
    Ok(Json(view))
}

/// Fetch the current screen of an attempt in progress.
#[utoipa::path(
    get,
    path = "/characters/{character_id}/quiz",
    responses(
        (status = 200, description = "The current quiz screen", body = QuizView),
        (status = 404, description = "Unknown character or no quiz in progress")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn get_quiz_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
) -> Result<Json<QuizView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    let attempts = state.quiz_attempts.lock().await;
    let engine = attempts
        .get(&(user_id, character_id.clone()))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "No quiz in progress for this character".to_string(),
            )
        })?;
    Ok(Json(quiz_view(character, engine.stage())))
}

/// Submit an answer for the current question. The first answer is binding;
/// repeats return the unchanged explanation screen.
#[utoipa::path(
    post,
    path = "/characters/{character_id}/quiz/answer",
    request_body = AnswerRequest,
    responses(
        (status = 200, description = "The explanation screen", body = QuizView),
        (status = 400, description = "The index names no option"),
        (status = 404, description = "Unknown character or no quiz in progress"),
        (status = 409, description = "No question is awaiting an answer")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn answer_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
    Json(payload): Json<AnswerRequest>,
) -> Result<Json<QuizView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    let mut attempts = state.quiz_attempts.lock().await;
    let engine = attempts
        .get_mut(&(user_id, character_id.clone()))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "No quiz in progress for this character".to_string(),
            )
        })?;

    match engine.select_answer(payload.answer_index) {
        Ok(AnswerOutcome::InvalidOption) => Err((
            StatusCode::BAD_REQUEST,
            format!("Option {} does not exist", payload.answer_index),
        )),
        Ok(_) => Ok(Json(quiz_view(character, engine.stage()))),
        Err(PortError::Invalid(msg)) => Err((StatusCode::CONFLICT, msg)),
        Err(e) => {
            error!("Failed to record an answer for '{character_id}': {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to record the answer".to_string(),
            ))
        }
    }
}

/// Leave the explanation screen: next question, level settlement, or onward
/// from a completed level.
#[utoipa::path(
    post,
    path = "/characters/{character_id}/quiz/advance",
    responses(
        (status = 200, description = "The next quiz screen", body = QuizView),
        (status = 404, description = "Unknown character or no quiz in progress"),
        (status = 409, description = "Nothing to advance from"),
        (status = 500, description = "Progress could not be saved")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn advance_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
) -> Result<Json<QuizView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    let mut attempts = state.quiz_attempts.lock().await;
    let engine = attempts
        .get_mut(&(user_id, character_id.clone()))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "No quiz in progress for this character".to_string(),
            )
        })?;

    match engine.advance().await {
        Ok(_) => Ok(Json(quiz_view(character, engine.stage()))),
        Err(PortError::Invalid(msg)) => Err((StatusCode::CONFLICT, msg)),
        Err(e) => {
            error!("Failed to advance the quiz for '{character_id}': {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to advance the quiz".to_string(),
            ))
        }
    }
}

/// Replay from the user's current target level after a fail or a pass.
#[utoipa::path(
    post,
    path = "/characters/{character_id}/quiz/retry",
    responses(
        (status = 200, description = "The opening screen of the fresh round", body = QuizView),
        (status = 404, description = "Unknown character or no quiz in progress"),
        (status = 409, description = "A round is already in play")
    ),
    params(
        ("character_id" = String, Path, description = "The character's roster id.")
    )
)]
pub async fn retry_handler(
    State(state): State<Arc<AppState>>,
    Extension(user_id): Extension<Uuid>,
    Path(character_id): Path<String>,
) -> Result<Json<QuizView>, (StatusCode, String)> {
    let character = require_character(&state, &character_id)?;
    let mut attempts = state.quiz_attempts.lock().await;
    let engine = attempts
        .get_mut(&(user_id, character_id.clone()))
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                "No quiz in progress for this character".to_string(),
            )
        })?;

    match engine.play_again().await {
        Ok(()) => Ok(Json(quiz_view(character, engine.stage()))),
        Err(PortError::Invalid(msg)) => Err((StatusCode::CONFLICT, msg)),
        Err(e) => {
            error!("Failed to restart the quiz for '{character_id}': {e}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to restart the quiz".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use mythquest_core::domain::{BioForm, CharacterBio, Question};
    use mythquest_core::memory::MemoryStateStore;
    use mythquest_core::ports::{ContentCatalog, PortResult};
    use mythquest_core::progress::ProgressStore;

    fn character() -> Character {
        Character {
            id: "arjuna".into(),
            name: "Arjuna".into(),
            short_bio: "The peerless archer of the Pandavas.".into(),
            skills: vec!["Archery".into()],
            traits: vec!["Focused".into()],
            greeting: "Greetings.".into(),
            personality: "Disciplined and searching.".into(),
            response_style: "Measured, reflective.".into(),
            total_levels: 2,
        }
    }

    struct OneBankCatalog {
        bank: Vec<Question>,
    }

    #[async_trait]
    impl ContentCatalog for OneBankCatalog {
        fn roster(&self) -> &[Character] {
            &[]
        }

        fn character(&self, _character_id: &str) -> Option<&Character> {
            None
        }

        async fn questions(&self, _character_id: &str) -> PortResult<Vec<Question>> {
            Ok(self.bank.clone())
        }

        async fn biography(&self, character_id: &str, _form: BioForm) -> PortResult<CharacterBio> {
            Err(mythquest_core::ports::PortError::NotFound(
                character_id.to_string(),
            ))
        }
    }

    async fn engine_with_one_question() -> QuizEngine {
        let catalog = Arc::new(OneBankCatalog {
            bank: vec![Question {
                id: 1,
                level: 1,
                prompt: "Who taught Arjuna archery?".into(),
                options: vec!["Drona".into(), "Bhishma".into(), "Kripa".into()],
                correct_answer: 0,
                explanation: "Drona trained all the princes of Hastinapura.".into(),
            }],
        });
        let progress = ProgressStore::new(Arc::new(MemoryStateStore::new()));
        QuizEngine::start(catalog, progress, Uuid::new_v4(), "arjuna").await
    }

    #[test]
    fn completing_the_final_level_marks_the_quest_complete() {
        let view = quiz_view(
            &character(),
            &QuizStage::LevelComplete {
                level: 2,
                score: 3,
                total: 3,
            },
        );
        match view {
            QuizView::LevelComplete { quest_complete, .. } => assert!(quest_complete),
            _ => panic!("expected a level-complete view"),
        }
    }

    #[test]
    fn completing_an_earlier_level_does_not() {
        let view = quiz_view(
            &character(),
            &QuizStage::LevelComplete {
                level: 1,
                score: 3,
                total: 3,
            },
        );
        match view {
            QuizView::LevelComplete { quest_complete, .. } => assert!(!quest_complete),
            _ => panic!("expected a level-complete view"),
        }
    }

    #[test]
    fn views_are_tagged_by_phase() {
        let view = quiz_view(
            &character(),
            &QuizStage::AllLevelsComplete {
                completed_levels: 2,
            },
        );
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["phase"], "all_levels_complete");
        assert_eq!(json["reward_unlocked"], true);

        let json =
            serde_json::to_value(quiz_view(&character(), &QuizStage::ContentUnavailable)).unwrap();
        assert_eq!(json["phase"], "content_unavailable");
    }

    #[tokio::test]
    async fn answering_and_explaining_screens_carry_the_right_fields() {
        let mut engine = engine_with_one_question().await;

        let json = serde_json::to_value(quiz_view(&character(), engine.stage())).unwrap();
        assert_eq!(json["phase"], "answering");
        assert_eq!(json["question_number"], 1);
        assert_eq!(json["options"].as_array().unwrap().len(), 3);
        // The answer key never leaves the server before the answer is bound.
        assert!(json.get("correct_answer").is_none());
        assert!(json.get("explanation").is_none());

        engine.select_answer(1).unwrap();
        let json = serde_json::to_value(quiz_view(&character(), engine.stage())).unwrap();
        assert_eq!(json["phase"], "explaining");
        assert_eq!(json["selected_answer"], 1);
        assert_eq!(json["correct_answer"], 0);
        assert_eq!(json["was_correct"], false);
        assert_eq!(json["last_question"], true);
    }
}
