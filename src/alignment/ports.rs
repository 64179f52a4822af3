use std::{future::Future, sync::Arc};

use async_trait::async_trait;

use crate::alignment::error::CompletionError;

/// Text-in, text-out model call consumed by the traversal engine. Retry, rate limiting
/// and context management all live behind this port.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}

/// `(left_response, right_response, left_label, right_label) -> prompt`
pub type BridgePromptFn = Arc<dyn Fn(&str, &str, &str, &str) -> String + Send + Sync>;

/// `(text_a, text_b) -> score`, used for diagnostics only.
pub type SimilarityFn = Arc<dyn Fn(&str, &str) -> f64 + Send + Sync>;

struct FnCompletion<F> {
    call: F,
}

#[async_trait]
impl<F, Fut> CompletionPort for FnCompletion<F>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, CompletionError>> + Send + 'static,
{
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        (self.call)(prompt.to_string()).await
    }
}

/// Adapts an async closure into a [`CompletionPort`].
pub fn completion_fn<F, Fut>(call: F) -> Arc<dyn CompletionPort>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<String, CompletionError>> + Send + 'static,
{
    Arc::new(FnCompletion { call })
}

#[derive(Debug, Clone, PartialEq)]
pub enum TraversalEvent {
    NodeStarted {
        depth: usize,
        left: String,
        right: String,
    },
    LowSimilarity {
        depth: usize,
        left: String,
        right: String,
        similarity: f64,
    },
    NodeResolved {
        depth: usize,
        left: String,
        right: String,
    },
}

pub trait TraversalTelemetryPort: Send + Sync {
    fn on_event(&self, event: TraversalEvent);
}

#[derive(Default)]
pub struct NoopTraversalTelemetry;

impl TraversalTelemetryPort for NoopTraversalTelemetry {
    fn on_event(&self, _event: TraversalEvent) {}
}
