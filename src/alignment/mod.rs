pub mod axis;
pub mod builder;
pub mod error;
pub mod mermaid;
pub mod node;
pub mod ports;
pub mod similarity;
pub mod traversal;

pub use axis::{Axis, AxisMap};
pub use builder::{build_tree, compose};
pub use error::{CompletionError, CompletionErrorKind};
pub use mermaid::{render_diagram, render_edges};
pub use node::AlignmentNode;
pub use ports::{
    BridgePromptFn, CompletionPort, NoopTraversalTelemetry, SimilarityFn, TraversalEvent,
    TraversalTelemetryPort, completion_fn,
};
pub use similarity::token_overlap;
pub use traversal::{
    AlignmentEngine, ContextPath, LOW_SIMILARITY_THRESHOLD, SubtreeMode, TraversalConfig,
    default_bridge_prompt, explain_prompt,
};
