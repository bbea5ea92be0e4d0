//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use mythquest_core::chat::ChatSessionManager;
use mythquest_core::ports::{ContentCatalog, IdentityStore};
use mythquest_core::progress::ProgressStore;
use mythquest_core::quiz::QuizEngine;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

//=========================================================================================
// AppState
//=========================================================================================

/// Everything the handlers share: the port handles, the game services, and
/// the live quiz attempts. Built once in `bin/api.rs` and cloned as an `Arc`.
pub struct AppState {
    pub identity: Arc<dyn IdentityStore>,
    pub catalog: Arc<dyn ContentCatalog>,
    pub progress: ProgressStore,
    pub chat: ChatSessionManager,
    /// Live quiz attempts, one per (user, character). Requests hold the map
    /// lock for the duration of their engine call, so each attempt is only
    /// ever driven by one request at a time.
    pub quiz_attempts: Mutex<HashMap<(Uuid, String), QuizEngine>>,
    pub config: Arc<Config>,
}
