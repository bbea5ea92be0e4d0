//! crates/mythquest_core/src/chat.rs
//!
//! Chat sessions with an unlocked character. A session is created lazily
//! with the character's greeting, persisted in full after every mutation,
//! and every user message is answered by exactly one character message even
//! when the reply generator fails.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::domain::{ChatMessage, ChatRole, ChatSession};
use crate::ports::{ChatTurn, ContentCatalog, PortError, PortResult, ReplyGenerator, StateStore};

/// Served in place of a generated reply when the generator fails.
pub const FALLBACK_REPLY: &str =
    "I apologize, but I am having trouble connecting to the divine realm. Please try again.";

/// Greeting used when a character record carries none of its own.
const DEFAULT_GREETING: &str = "Greetings, seeker. I am honored to share my story with you.";

/// Most prior turns ever handed to the reply generator. Hard cap; the oldest
/// turns fall off first.
pub const CONTEXT_WINDOW: usize = 10;

/// Storage key for a transcript under a user's state.
pub fn transcript_key(character_id: &str) -> String {
    format!("chat:{character_id}")
}

pub struct ChatSessionManager {
    store: Arc<dyn StateStore>,
    generator: Arc<dyn ReplyGenerator>,
    catalog: Arc<dyn ContentCatalog>,
}

impl ChatSessionManager {
    pub fn new(
        store: Arc<dyn StateStore>,
        generator: Arc<dyn ReplyGenerator>,
        catalog: Arc<dyn ContentCatalog>,
    ) -> Self {
        Self {
            store,
            generator,
            catalog,
        }
    }

    /// The user's session with the character, creating and persisting a
    /// greeting-only session on first contact. A corrupt stored transcript
    /// is discarded and replaced the same way.
    pub async fn open_session(&self, user_id: Uuid, character_id: &str) -> PortResult<ChatSession> {
        if let Some(session) = self.load_transcript(user_id, character_id).await? {
            return Ok(session);
        }
        let greeting = self
            .catalog
            .character(character_id)
            .map(|c| c.greeting.clone())
            .unwrap_or_else(|| DEFAULT_GREETING.to_string());
        let session = ChatSession {
            character_id: character_id.to_string(),
            messages: vec![character_message(greeting)],
            last_updated: Utc::now(),
        };
        self.persist(user_id, &session).await?;
        Ok(session)
    }

    /// Appends the user's message and exactly one character reply, writing
    /// the transcript through after each append. Generator failures fall
    /// back to a fixed apology instead of propagating.
    pub async fn send_message(
        &self,
        user_id: Uuid,
        character_id: &str,
        text: &str,
    ) -> PortResult<ChatSession> {
        let mut session = self.open_session(user_id, character_id).await?;

        // Context is the trailing window of turns before this message.
        let start = session.messages.len().saturating_sub(CONTEXT_WINDOW);
        let history: Vec<ChatTurn> = session.messages[start..]
            .iter()
            .map(|m| ChatTurn {
                role: m.role,
                content: m.content.clone(),
            })
            .collect();

        session.messages.push(ChatMessage {
            id: Uuid::now_v7(),
            role: ChatRole::User,
            content: text.to_string(),
            timestamp: Utc::now(),
        });
        session.last_updated = Utc::now();
        self.persist(user_id, &session).await?;

        let reply = match self
            .generator
            .generate_reply(character_id, text, &history)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!("reply generation failed for '{character_id}': {e}");
                FALLBACK_REPLY.to_string()
            }
        };
        session.messages.push(character_message(reply));
        session.last_updated = Utc::now();
        self.persist(user_id, &session).await?;
        Ok(session)
    }

    async fn load_transcript(
        &self,
        user_id: Uuid,
        character_id: &str,
    ) -> PortResult<Option<ChatSession>> {
        let key = transcript_key(character_id);
        let Some(value) = self.store.read(user_id, &key).await? else {
            return Ok(None);
        };
        match serde_json::from_value(value) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!("corrupt transcript under '{key}' for {user_id}: {e}; discarding it");
                Ok(None)
            }
        }
    }

    async fn persist(&self, user_id: Uuid, session: &ChatSession) -> PortResult<()> {
        let value = serde_json::to_value(session)
            .map_err(|e| PortError::Unexpected(format!("serialize transcript: {e}")))?;
        self.store
            .write(user_id, &transcript_key(&session.character_id), value)
            .await
    }
}

fn character_message(content: String) -> ChatMessage {
    ChatMessage {
        id: Uuid::now_v7(),
        role: ChatRole::Character,
        content,
        timestamp: Utc::now(),
    }
}
