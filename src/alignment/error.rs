use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionErrorKind {
    InvalidRequest,
    Authentication,
    Authorization,
    RateLimited,
    ContextOverflow,
    Timeout,
    BackendTransient,
    ProtocolViolation,
    Internal,
}

/// Failure reported by a completion port. The traversal engine propagates it unchanged.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct CompletionError {
    pub kind: CompletionErrorKind,
    pub message: String,
    pub retryable: bool,
    pub retry_after: Option<Duration>,
    pub http_status: Option<u16>,
}

impl CompletionError {
    pub fn new(kind: CompletionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: matches!(
                kind,
                CompletionErrorKind::RateLimited
                    | CompletionErrorKind::Timeout
                    | CompletionErrorKind::BackendTransient
            ),
            retry_after: None,
            http_status: None,
        }
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }
}

pub fn invalid_request(message: impl Into<String>) -> CompletionError {
    CompletionError::new(CompletionErrorKind::InvalidRequest, message)
}

pub fn protocol_violation(message: impl Into<String>) -> CompletionError {
    CompletionError::new(CompletionErrorKind::ProtocolViolation, message)
}

pub fn internal_error(message: impl Into<String>) -> CompletionError {
    CompletionError::new(CompletionErrorKind::Internal, message)
}
