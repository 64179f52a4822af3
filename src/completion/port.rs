use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    alignment::{error::CompletionError, ports::CompletionPort},
    completion::{
        client::ChatClient,
        reliability::ReliabilityLayer,
        session::SessionCompletion,
        types::{ChatMessage, ChatRequest, CompletionConfig},
    },
};

/// Stateless completion port: every prompt is a fresh single-turn conversation.
pub struct ChatCompletion {
    client: ChatClient,
    reliability: ReliabilityLayer,
    model: String,
    instructions: Option<String>,
    max_output_tokens: Option<u64>,
}

impl ChatCompletion {
    pub fn new(client: ChatClient, config: &CompletionConfig) -> Self {
        Self {
            client,
            reliability: ReliabilityLayer::new(config.reliability.clone()),
            model: config.model.clone(),
            instructions: config.instructions.clone(),
            max_output_tokens: config.max_output_tokens,
        }
    }
}

#[async_trait]
impl CompletionPort for ChatCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(instructions) = &self.instructions {
            messages.push(ChatMessage::system(instructions.clone()));
        }
        messages.push(ChatMessage::user(prompt));

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            max_output_tokens: self.max_output_tokens,
        };
        let reply = self
            .reliability
            .execute("chat_complete", || self.client.chat(request.clone()))
            .await?;
        Ok(reply.text)
    }
}

/// Picks the session-carrying port when `session.enabled`, the stateless one otherwise.
pub fn completion_from_config(
    config: &CompletionConfig,
) -> Result<Arc<dyn CompletionPort>, CompletionError> {
    let client = ChatClient::new(config)?;
    if config.session.enabled {
        Ok(Arc::new(SessionCompletion::new(client, config)))
    } else {
        Ok(Arc::new(ChatCompletion::new(client, config)))
    }
}
