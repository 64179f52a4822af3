use std::env;

use crate::{
    alignment::error::{CompletionError, CompletionErrorKind, invalid_request},
    completion::types::CredentialRef,
};

/// Resolves a credential reference into an `Authorization` header value.
pub fn resolve_auth_header(reference: &CredentialRef) -> Result<Option<String>, CompletionError> {
    match reference {
        CredentialRef::Env { var } => {
            let token = env::var(var).map_err(|_| {
                CompletionError::new(
                    CompletionErrorKind::Authentication,
                    format!("missing credential environment variable {}", var),
                )
                .with_retryable(false)
            })?;
            Ok(Some(format!("Bearer {}", token)))
        }
        CredentialRef::InlineToken { token } => {
            if token.trim().is_empty() {
                return Err(invalid_request("inline credential token cannot be empty"));
            }
            Ok(Some(format!("Bearer {}", token)))
        }
        CredentialRef::None => Ok(None),
    }
}
