pub mod auth;
pub mod chat;
pub mod middleware;
pub mod quiz;
pub mod rest;
pub mod state;

// Re-export the handlers the binary wires into the router.
pub use auth::{login_handler, logout_handler, signup_handler};
pub use chat::{open_chat_handler, send_chat_handler};
pub use middleware::require_auth;
pub use quiz::{advance_handler, answer_handler, get_quiz_handler, retry_handler, start_quiz_handler};
pub use rest::{
    get_biography_handler, get_character_handler, list_characters_handler, reset_progress_handler,
};
