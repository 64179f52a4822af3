use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialRef {
    Env { var: String },
    InlineToken { token: String },
    None,
}

impl Default for CredentialRef {
    fn default() -> Self {
        Self::Env {
            var: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    pub credential: CredentialRef,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default)]
    pub max_output_tokens: Option<u64>,
    #[serde(default)]
    pub reliability: ReliabilityConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReliabilityConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
}

impl Default for ReliabilityConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
        }
    }
}

/// Conversation-carrying mode: history is resent with every prompt and rolled up into a
/// summary before it outgrows the token budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_soft_limit_tokens")]
    pub soft_limit_tokens: usize,
    #[serde(default = "default_output_reserve_tokens")]
    pub output_reserve_tokens: usize,
    #[serde(default = "default_summary_target_tokens")]
    pub summary_target_tokens: usize,
    #[serde(default)]
    pub summarizer_model: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            soft_limit_tokens: default_soft_limit_tokens(),
            output_reserve_tokens: default_output_reserve_tokens(),
            summary_target_tokens: default_summary_target_tokens(),
            summarizer_model: None,
        }
    }
}

impl SessionConfig {
    pub fn prompt_budget(&self) -> usize {
        self.soft_limit_tokens
            .saturating_sub(self.output_reserve_tokens)
    }
}

fn default_request_timeout_ms() -> u64 {
    120_000
}

fn default_max_retries() -> u32 {
    6
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    15_000
}

fn default_soft_limit_tokens() -> usize {
    28_000
}

fn default_output_reserve_tokens() -> usize {
    1_500
}

fn default_summary_target_tokens() -> usize {
    800
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_output_tokens: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageStats {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ChatReply {
    pub request_id: String,
    pub text: String,
    pub usage: Option<UsageStats>,
}
