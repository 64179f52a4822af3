use std::time::Duration;

use reqwest::{Client, header};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    alignment::error::{CompletionError, CompletionErrorKind, internal_error, protocol_violation},
    completion::{
        credentials::resolve_auth_header,
        reliability::parse_retry_hint,
        types::{ChatReply, ChatRequest, CompletionConfig, UsageStats},
    },
};

const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset-tokens";

/// OpenAI-compatible `chat/completions` client. One call, no retries.
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    auth_header: Option<String>,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        if config.endpoint.trim().is_empty() {
            return Err(CompletionError::new(
                CompletionErrorKind::InvalidRequest,
                "completion endpoint cannot be empty",
            )
            .with_retryable(false));
        }

        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| internal_error(format!("failed to build http client: {}", err)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            auth_header: resolve_auth_header(&config.credential)?,
            timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
        })
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatReply, CompletionError> {
        let url = format!("{}/chat/completions", self.endpoint.trim_end_matches('/'));
        let request_id = Uuid::now_v7().to_string();

        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
        });
        if let Some(max_tokens) = request.max_output_tokens {
            body["max_tokens"] = Value::Number(max_tokens.into());
        }

        let mut req_builder = self
            .client
            .post(url)
            .timeout(self.timeout)
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-request-id", request_id.as_str())
            .json(&body);
        if let Some(auth_header) = &self.auth_header {
            req_builder = req_builder.header(header::AUTHORIZATION, auth_header);
        }

        tracing::debug!(
            target: "completion",
            request_id = %request_id,
            model = %request.model,
            messages = request.messages.len(),
            "chat_request_sent"
        );

        let response = req_builder.send().await.map_err(|err| {
            let kind = if err.is_timeout() {
                CompletionErrorKind::Timeout
            } else {
                CompletionErrorKind::BackendTransient
            };
            CompletionError::new(kind, format!("chat completion request failed: {}", err))
        })?;

        let status = response.status();
        if !status.is_success() {
            let reset_header = response
                .headers()
                .get(RATE_LIMIT_RESET_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(
                status.as_u16(),
                &body,
                reset_header.as_deref(),
            ));
        }

        let payload = response.json::<Value>().await.map_err(|err| {
            protocol_violation(format!("chat completion body decode failed: {}", err))
                .with_retryable(false)
        })?;
        let (text, usage) = parse_chat_payload(&payload)?;

        tracing::debug!(
            target: "completion",
            request_id = %request_id,
            input_tokens = ?usage.as_ref().and_then(|u| u.input_tokens),
            output_tokens = ?usage.as_ref().and_then(|u| u.output_tokens),
            "chat_request_completed"
        );

        Ok(ChatReply {
            request_id,
            text,
            usage,
        })
    }
}

pub fn map_http_error(status: u16, body: &str, reset_header: Option<&str>) -> CompletionError {
    let normalized_body = body.chars().take(240).collect::<String>();

    let mut err = if status == 401 {
        CompletionError::new(CompletionErrorKind::Authentication, "authentication failed")
            .with_retryable(false)
    } else if status == 403 {
        CompletionError::new(CompletionErrorKind::Authorization, "authorization failed")
            .with_retryable(false)
    } else if status == 429 && body.to_ascii_lowercase().contains("request too large") {
        CompletionError::new(
            CompletionErrorKind::ContextOverflow,
            format!("backend returned status {}", status),
        )
        .with_retryable(false)
    } else if status == 408 || status == 429 {
        CompletionError::new(
            CompletionErrorKind::RateLimited,
            format!("backend returned status {}", status),
        )
        .with_retryable(true)
    } else if (400..500).contains(&status) {
        CompletionError::new(
            CompletionErrorKind::InvalidRequest,
            format!("backend returned status {}", status),
        )
        .with_retryable(false)
    } else {
        CompletionError::new(
            CompletionErrorKind::BackendTransient,
            format!("backend returned status {}", status),
        )
        .with_retryable(true)
    };

    err = err.with_http_status(status);
    if let Some(delay) = parse_retry_hint(reset_header, body) {
        err = err.with_retry_after(delay);
    }
    if !normalized_body.is_empty() {
        err.message = format!("{}: {}", err.message, normalized_body);
    }

    err
}

fn parse_chat_payload(payload: &Value) -> Result<(String, Option<UsageStats>), CompletionError> {
    let choice = payload
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .ok_or_else(|| {
            protocol_violation("chat completion response missing choices").with_retryable(false)
        })?;

    let text = choice
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    let usage = payload.get("usage").map(|usage| UsageStats {
        input_tokens: usage
            .get("prompt_tokens")
            .and_then(Value::as_u64)
            .or_else(|| usage.get("input_tokens").and_then(Value::as_u64)),
        output_tokens: usage
            .get("completion_tokens")
            .and_then(Value::as_u64)
            .or_else(|| usage.get("output_tokens").and_then(Value::as_u64)),
        total_tokens: usage.get("total_tokens").and_then(Value::as_u64),
    });

    Ok((text, usage))
}
