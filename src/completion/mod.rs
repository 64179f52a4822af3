pub mod client;
pub mod credentials;
pub mod port;
pub mod reliability;
pub mod session;
pub mod types;

pub use client::ChatClient;
pub use port::{ChatCompletion, completion_from_config};
pub use reliability::ReliabilityLayer;
pub use session::SessionCompletion;
pub use types::{CompletionConfig, CredentialRef, ReliabilityConfig, SessionConfig};
