//! services/api/src/adapters/reply_llm.rs
//!
//! OpenAI-backed implementation of the `ReplyGenerator` port. Builds a
//! per-character system prompt from the roster's persona metadata and sends
//! the capped conversation window as chat history.

use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use mythquest_core::domain::ChatRole;
use mythquest_core::ports::{ChatTurn, ContentCatalog, PortError, PortResult, ReplyGenerator};

pub struct OpenAiReplyAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    catalog: Arc<dyn ContentCatalog>,
}

impl OpenAiReplyAdapter {
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        catalog: Arc<dyn ContentCatalog>,
    ) -> Self {
        Self {
            client,
            model,
            catalog,
        }
    }

    fn system_prompt(&self, character_id: &str) -> String {
        match self.catalog.character(character_id) {
            Some(c) => format!(
                "You are {name} from the Mahabharata. {personality} \
                 Respond as {name} would: {style} Stay entirely in character, \
                 speak from the events of the epic as you lived them, and keep \
                 answers to two or three sentences. Never mention being an AI.",
                name = c.name,
                personality = c.personality,
                style = c.response_style,
            ),
            None => "You are a wise guide to the Mahabharata. Answer warmly and \
                     concisely, in two or three sentences."
                .to_string(),
        }
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiReplyAdapter {
    async fn generate_reply(
        &self,
        character_id: &str,
        message: &str,
        history: &[ChatTurn],
    ) -> PortResult<String> {
        let mut messages = vec![ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(self.system_prompt(character_id))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        )];

        for turn in history {
            let mapped = match turn.role {
                ChatRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                ),
                ChatRole::Character => ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessageArgs::default()
                        .content(turn.content.clone())
                        .build()
                        .map_err(|e| PortError::Unexpected(e.to_string()))?,
                ),
            };
            messages.push(mapped);
        }

        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message.to_string())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        ));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(200u32)
            .temperature(0.8)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let reply = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No reply generated".to_string()))?;

        Ok(reply.trim().to_string())
    }
}
