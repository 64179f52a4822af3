use std::{future::Future, sync::LazyLock, time::Duration};

use regex::Regex;
use tokio::time::sleep;

use crate::{alignment::error::CompletionError, completion::types::ReliabilityConfig};

static RESET_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([\d.]+)s").expect("static pattern must compile"));
static TRY_AGAIN_MS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)try again in (\d+)ms").expect("static pattern must compile")
});

#[derive(Debug, Clone)]
pub struct ReliabilityLayer {
    config: ReliabilityConfig,
}

impl ReliabilityLayer {
    pub fn new(config: ReliabilityConfig) -> Self {
        Self { config }
    }

    /// `attempt` counts failures already retried.
    pub fn can_retry(&self, err: &CompletionError, attempt: u32) -> bool {
        err.retryable && attempt < self.config.max_retries
    }

    /// Exponential fallback used when the provider gave no delay hint. `attempt` starts at 1
    /// for the first retry.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.config.backoff_base_ms.max(1);
        let max = self.config.backoff_max_ms.max(1);
        let factor = 2_u64.saturating_pow(attempt.min(32));
        Duration::from_millis(base.saturating_mul(factor).min(max))
    }

    pub fn retry_delay(&self, err: &CompletionError, attempt: u32) -> Duration {
        err.retry_after
            .unwrap_or_else(|| self.backoff_delay(attempt))
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error, or the retry
    /// budget is spent. The last error is returned as-is.
    pub async fn execute<T, F, Fut>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, CompletionError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let mut attempt = 0_u32;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !self.can_retry(&err, attempt) {
                tracing::debug!(
                    target: "completion",
                    operation = operation_name,
                    attempts = attempt + 1,
                    kind = ?err.kind,
                    retryable = err.retryable,
                    error = %err.message,
                    "completion_request_failed"
                );
                return Err(err);
            }

            attempt += 1;
            let delay = self.retry_delay(&err, attempt);
            tracing::warn!(
                target: "completion",
                operation = operation_name,
                attempt = attempt,
                max_retries = self.config.max_retries,
                kind = ?err.kind,
                http_status = ?err.http_status,
                delay_ms = delay.as_millis() as u64,
                "completion_attempt_failed"
            );
            sleep(delay).await;
        }
    }
}

/// Provider delay hint, from the `x-ratelimit-reset-tokens` header (e.g. `"1.5s"`) or an
/// error message of the form `"try again in 250ms"`.
pub fn parse_retry_hint(reset_header: Option<&str>, message: &str) -> Option<Duration> {
    if let Some(header) = reset_header
        && let Some(captures) = RESET_SECONDS.captures(header)
        && let Ok(seconds) = captures[1].parse::<f64>()
        && seconds.is_finite()
        && seconds >= 0.0
    {
        return Some(Duration::from_millis((seconds * 1000.0).ceil() as u64));
    }

    TRY_AGAIN_MS
        .captures(message)
        .and_then(|captures| captures[1].parse::<u64>().ok())
        .map(Duration::from_millis)
}
