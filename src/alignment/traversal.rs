//! Recursive explain-then-bridge synthesis over an [`AlignmentNode`] tree.
//!
//! For every non-leaf node the engine asks the completion port to explain both poles in
//! parallel, writes the answers into the two children, resolves both child subtrees, and
//! only then asks for a bridge concept that replaces the node's own payload.
//!
//! A failed completion aborts the walk and is returned unchanged. The tree is then
//! partially populated (some descendants resolved, their ancestors not) and must not be
//! rendered or traversed again from the middle; rebuild it and start over.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::alignment::{
    error::CompletionError,
    node::AlignmentNode,
    ports::{
        BridgePromptFn, CompletionPort, NoopTraversalTelemetry, SimilarityFn, TraversalEvent,
        TraversalTelemetryPort,
    },
    similarity::token_overlap,
};

/// Sibling explanations scoring below this are reported as diverging.
pub const LOW_SIMILARITY_THRESHOLD: f64 = 0.15;

const CONTEXT_SEPARATOR: &str = " -> ";

/// Pole labels from the root down to a node's parent. Pushing returns a new path, so a
/// label added for one branch is never visible to its sibling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPath {
    labels: Vec<String>,
}

impl ContextPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn pushed(&self, label: &str) -> Self {
        let mut labels = Vec::with_capacity(self.labels.len() + 1);
        labels.extend(self.labels.iter().cloned());
        labels.push(label.to_string());
        Self { labels }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn render(&self) -> String {
        self.labels.join(CONTEXT_SEPARATOR)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtreeMode {
    /// Left subtree fully resolved before the right one starts.
    #[default]
    Sequential,
    /// Both child subtrees joined concurrently.
    Parallel,
}

#[derive(Clone)]
pub struct TraversalConfig {
    pub completion: Arc<dyn CompletionPort>,
    pub bridge_prompt: Option<BridgePromptFn>,
    pub similarity: Option<SimilarityFn>,
    pub subtree_mode: SubtreeMode,
    pub telemetry: Option<Arc<dyn TraversalTelemetryPort>>,
}

impl TraversalConfig {
    pub fn new(completion: Arc<dyn CompletionPort>) -> Self {
        Self {
            completion,
            bridge_prompt: None,
            similarity: None,
            subtree_mode: SubtreeMode::default(),
            telemetry: None,
        }
    }

    pub fn with_bridge_prompt(
        mut self,
        bridge_prompt: impl Fn(&str, &str, &str, &str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.bridge_prompt = Some(Arc::new(bridge_prompt));
        self
    }

    pub fn with_similarity(
        mut self,
        similarity: impl Fn(&str, &str) -> f64 + Send + Sync + 'static,
    ) -> Self {
        self.similarity = Some(Arc::new(similarity));
        self
    }

    pub fn with_subtree_mode(mut self, subtree_mode: SubtreeMode) -> Self {
        self.subtree_mode = subtree_mode;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<dyn TraversalTelemetryPort>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }
}

pub fn default_bridge_prompt(
    left_response: &str,
    right_response: &str,
    left: &str,
    right: &str,
) -> String {
    format!("Given\n{left}: {left_response}\n{right}: {right_response}\nWhat concept unifies them?")
}

pub fn explain_prompt(context: &ContextPath, pole: &str, concept: &str) -> String {
    if context.is_empty() {
        format!("{pole}: Explain {concept}")
    } else {
        format!(
            "{}{}{pole}: Explain {concept}",
            context.render(),
            CONTEXT_SEPARATOR
        )
    }
}

pub struct AlignmentEngine {
    completion: Arc<dyn CompletionPort>,
    bridge_prompt: BridgePromptFn,
    similarity: SimilarityFn,
    subtree_mode: SubtreeMode,
    telemetry: Arc<dyn TraversalTelemetryPort>,
}

impl AlignmentEngine {
    pub fn new(config: TraversalConfig) -> Self {
        Self {
            completion: config.completion,
            bridge_prompt: config
                .bridge_prompt
                .unwrap_or_else(|| Arc::new(default_bridge_prompt)),
            similarity: config.similarity.unwrap_or_else(|| Arc::new(token_overlap)),
            subtree_mode: config.subtree_mode,
            telemetry: config
                .telemetry
                .unwrap_or_else(|| Arc::new(NoopTraversalTelemetry)),
        }
    }

    pub fn subtree_mode(&self) -> SubtreeMode {
        self.subtree_mode
    }

    /// Populates `node` and its whole subtree. `context` holds the pole labels above
    /// `node`; depth in diagnostics is counted from `node` itself.
    pub async fn traverse(
        &self,
        node: &mut AlignmentNode,
        context: &ContextPath,
    ) -> Result<(), CompletionError> {
        self.walk(node, context.clone(), 0).await
    }

    pub async fn traverse_root(&self, node: &mut AlignmentNode) -> Result<(), CompletionError> {
        self.traverse(node, &ContextPath::new()).await
    }

    fn walk<'a>(
        &'a self,
        node: &'a mut AlignmentNode,
        context: ContextPath,
        depth: usize,
    ) -> BoxFuture<'a, Result<(), CompletionError>> {
        Box::pin(async move {
            if node.is_leaf() {
                return Ok(());
            }

            let left = node.axis.left.clone();
            let right = node.axis.right.clone();
            self.telemetry.on_event(TraversalEvent::NodeStarted {
                depth,
                left: left.clone(),
                right: right.clone(),
            });

            // The concept must be read before any payload below or on this node changes.
            let concept = node.payload_str().to_string();
            let left_prompt = explain_prompt(&context, &left, &concept);
            let right_prompt = explain_prompt(&context, &right, &concept);
            tracing::debug!(
                target: "alignment",
                depth = depth,
                context = %context.render(),
                left = %left,
                right = %right,
                "explain_poles_requested"
            );

            let (left_response, right_response) = tokio::try_join!(
                self.completion.complete(&left_prompt),
                self.completion.complete(&right_prompt)
            )?;

            let Some([left_child, right_child]) = node.children.as_deref_mut() else {
                return Ok(());
            };
            left_child.payload = Some(left_response.clone());
            right_child.payload = Some(right_response.clone());

            let left_context = context.pushed(&left);
            let right_context = context.pushed(&right);
            match self.subtree_mode {
                SubtreeMode::Sequential => {
                    self.walk(left_child, left_context, depth + 1).await?;
                    self.walk(right_child, right_context, depth + 1).await?;
                }
                SubtreeMode::Parallel => {
                    tokio::try_join!(
                        self.walk(left_child, left_context, depth + 1),
                        self.walk(right_child, right_context, depth + 1)
                    )?;
                }
            }

            let bridge_prompt = (self.bridge_prompt)(&left_response, &right_response, &left, &right);
            let bridge = self.completion.complete(&bridge_prompt).await?;

            let similarity = (self.similarity)(&left_response, &right_response);
            if similarity < LOW_SIMILARITY_THRESHOLD {
                tracing::warn!(
                    target: "alignment",
                    depth = depth,
                    left = %left,
                    right = %right,
                    similarity = format_args!("{similarity:.2}"),
                    "low_similarity"
                );
                self.telemetry.on_event(TraversalEvent::LowSimilarity {
                    depth,
                    left: left.clone(),
                    right: right.clone(),
                    similarity,
                });
            }

            node.payload = Some(bridge);
            tracing::debug!(
                target: "alignment",
                depth = depth,
                left = %left,
                right = %right,
                "node_bridged"
            );
            self.telemetry
                .on_event(TraversalEvent::NodeResolved { depth, left, right });
            Ok(())
        })
    }
}
