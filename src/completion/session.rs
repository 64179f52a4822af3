use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    alignment::{
        error::{CompletionError, CompletionErrorKind},
        ports::CompletionPort,
    },
    completion::{
        client::ChatClient,
        reliability::ReliabilityLayer,
        types::{ChatMessage, ChatRequest, ChatRole, CompletionConfig, SessionConfig},
    },
};

const SUMMARIZER_SYSTEM_PROMPT: &str = "You are a helpful summariser.";

/// Rough token estimate: one token per four characters.
pub fn approx_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[derive(Debug, Default)]
struct SessionState {
    history: Vec<ChatMessage>,
    summary: Option<String>,
    /// Bumped by every committed roll-up.
    generation: u64,
}

/// Completion port that keeps one running conversation. Every prompt is sent with the
/// accumulated history; when the prospective request would exceed the prompt budget the
/// history is first condensed into a summary that rides along in the system message.
///
/// Roll-ups are serialized. Concurrent prompts that both find the budget exceeded share
/// one summary, and exchanges appended while a summary is being written stay in history.
pub struct SessionCompletion {
    client: ChatClient,
    reliability: ReliabilityLayer,
    model: String,
    summarizer_model: String,
    instructions: Option<String>,
    max_output_tokens: Option<u64>,
    limits: SessionConfig,
    state: Mutex<SessionState>,
    roll_up_gate: Mutex<()>,
}

impl SessionCompletion {
    pub fn new(client: ChatClient, config: &CompletionConfig) -> Self {
        Self {
            client,
            reliability: ReliabilityLayer::new(config.reliability.clone()),
            model: config.model.clone(),
            summarizer_model: config
                .session
                .summarizer_model
                .clone()
                .unwrap_or_else(|| config.model.clone()),
            instructions: config.instructions.clone(),
            max_output_tokens: config.max_output_tokens,
            limits: config.session.clone(),
            state: Mutex::new(SessionState::default()),
            roll_up_gate: Mutex::new(()),
        }
    }

    pub async fn history_len(&self) -> usize {
        self.state.lock().await.history.len()
    }

    pub async fn summary(&self) -> Option<String> {
        self.state.lock().await.summary.clone()
    }

    /// Number of roll-ups committed so far.
    pub async fn generation(&self) -> u64 {
        self.state.lock().await.generation
    }

    /// Folds the current summary and history into a new model-written summary. A no-op
    /// on an empty history.
    pub async fn roll_up(&self) -> Result<(), CompletionError> {
        let _gate = self.roll_up_gate.lock().await;
        self.roll_up_gated().await
    }

    /// Rolls up only if `prompt` still does not fit once any roll-up already in flight
    /// has finished.
    async fn roll_up_if_over_budget(&self, prompt: &str) -> Result<(), CompletionError> {
        let _gate = self.roll_up_gate.lock().await;
        let prospective = self.prospective_tokens(prompt).await;
        if prospective <= self.limits.prompt_budget() {
            return Ok(());
        }
        tracing::info!(
            target: "completion",
            prospective_tokens = prospective,
            budget_tokens = self.limits.prompt_budget(),
            "session_budget_exceeded"
        );
        self.roll_up_gated().await
    }

    /// Caller must hold `roll_up_gate`.
    async fn roll_up_gated(&self) -> Result<(), CompletionError> {
        let (snapshot, previous_summary, generation) = {
            let state = self.state.lock().await;
            (
                state.history.clone(),
                state.summary.clone(),
                state.generation,
            )
        };
        if snapshot.is_empty() {
            return Ok(());
        }

        let mut sections = Vec::with_capacity(snapshot.len() + 1);
        if let Some(previous) = &previous_summary {
            sections.push(format!("EARLIER SUMMARY: {}", previous));
        }
        sections.extend(
            snapshot
                .iter()
                .map(|message| format!("{}: {}", role_label(message.role), message.content)),
        );
        let prompt = format!(
            "Summarise the following conversation in under {} tokens. Focus on key insights and decisions.\n\n{}",
            self.limits.summary_target_tokens,
            sections.join("\n\n")
        );
        let request = ChatRequest {
            model: self.summarizer_model.clone(),
            messages: vec![
                ChatMessage::system(SUMMARIZER_SYSTEM_PROMPT),
                ChatMessage::user(prompt),
            ],
            max_output_tokens: Some(self.limits.summary_target_tokens as u64 + 50),
        };
        let reply = self
            .reliability
            .execute("session_roll_up", || self.client.chat(request.clone()))
            .await?;

        let summary_tokens = approx_tokens(&reply.text);
        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::warn!(
                target: "completion",
                expected_generation = generation,
                found_generation = state.generation,
                "session_roll_up_discarded"
            );
            return Ok(());
        }
        // Only history appends can happen while the gate is held, so the snapshot is
        // still the prefix of the current history.
        state.history.drain(..snapshot.len());
        state.summary = Some(reply.text);
        state.generation += 1;
        let kept = state.history.len();
        drop(state);

        tracing::info!(
            target: "completion",
            summarized_messages = snapshot.len(),
            kept_messages = kept,
            summary_tokens = summary_tokens,
            generation = generation + 1,
            "session_history_rolled_up"
        );
        Ok(())
    }

    async fn prospective_tokens(&self, prompt: &str) -> usize {
        let state = self.state.lock().await;
        let mut total = approx_tokens(prompt)
            + self.instructions.as_deref().map(approx_tokens).unwrap_or(0);
        if let Some(summary) = &state.summary {
            total += approx_tokens(summary);
        }
        total
            + state
                .history
                .iter()
                .map(|message| approx_tokens(&message.content))
                .sum::<usize>()
    }

    async fn compose_messages(&self, prompt: &str) -> Vec<ChatMessage> {
        let state = self.state.lock().await;
        let mut messages = Vec::with_capacity(state.history.len() + 2);
        if let Some(system) = system_prompt(self.instructions.as_deref(), state.summary.as_deref())
        {
            messages.push(ChatMessage::system(system));
        }
        messages.extend(state.history.iter().cloned());
        messages.push(ChatMessage::user(prompt));
        messages
    }
}

#[async_trait]
impl CompletionPort for SessionCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if self.prospective_tokens(prompt).await > self.limits.prompt_budget() {
            self.roll_up_if_over_budget(prompt).await?;
        }

        let mut rolled_up_after_overflow = false;
        loop {
            let request = ChatRequest {
                model: self.model.clone(),
                messages: self.compose_messages(prompt).await,
                max_output_tokens: self.max_output_tokens,
            };
            let result = self
                .reliability
                .execute("session_complete", || self.client.chat(request.clone()))
                .await;

            match result {
                Ok(reply) => {
                    let mut state = self.state.lock().await;
                    state.history.push(ChatMessage::user(prompt));
                    state.history.push(ChatMessage::assistant(reply.text.clone()));
                    return Ok(reply.text);
                }
                Err(err)
                    if err.kind == CompletionErrorKind::ContextOverflow
                        && !rolled_up_after_overflow =>
                {
                    tracing::warn!(
                        target: "completion",
                        error = %err.message,
                        "session_request_too_large"
                    );
                    self.roll_up().await?;
                    rolled_up_after_overflow = true;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn system_prompt(instructions: Option<&str>, summary: Option<&str>) -> Option<String> {
    match (instructions, summary) {
        (Some(instructions), Some(summary)) => {
            Some(format!("{}\n\nSummary so far: {}", instructions, summary))
        }
        (Some(instructions), None) => Some(instructions.to_string()),
        (None, Some(summary)) => Some(format!("Summary so far: {}", summary)),
        (None, None) => None,
    }
}

fn role_label(role: ChatRole) -> &'static str {
    match role {
        ChatRole::System => "SYSTEM",
        ChatRole::User => "USER",
        ChatRole::Assistant => "ASSISTANT",
    }
}
