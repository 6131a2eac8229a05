//! Identity port: resolves caller credentials to stable user identifiers.
//!
//! The core performs no authentication itself; it trusts the user id the
//! identity provider resolves. The service layer uses this port as the
//! authorization gate in front of the orchestrator, so balance checks and
//! debits cannot be bypassed by calling storage directly.

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// Environment variable holding static token mappings for development,
/// formatted as `token=user_id` pairs separated by commas.
pub const TOKENS_ENV_VAR: &str = "POSTFORGE_TOKENS";

/// Errors from identity resolution.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No credential was presented.
    #[error("missing credentials")]
    MissingCredentials,

    /// The credential did not resolve to a known user.
    #[error("unrecognized credentials")]
    Unrecognized,
}

/// Maps a bearer credential to a stable user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Resolve a bearer token to the caller's user id.
    async fn resolve(&self, token: &str) -> Result<String, IdentityError>;
}

/// Shared identity provider handle.
pub type DynIdentityProvider = Arc<dyn IdentityProvider>;

/// Static token table for development and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenIdentity {
    tokens: HashMap<String, String>,
}

impl StaticTokenIdentity {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a token mapping.
    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }

    /// Build the table from `POSTFORGE_TOKENS` (`token=user,token=user`).
    pub fn from_env() -> Self {
        let mut identity = Self::new();
        let Ok(raw) = env::var(TOKENS_ENV_VAR) else {
            return identity;
        };
        for pair in raw.split(',') {
            if let Some((token, user_id)) = pair.split_once('=') {
                let token = token.trim();
                let user_id = user_id.trim();
                if !token.is_empty() && !user_id.is_empty() {
                    identity.tokens.insert(token.to_string(), user_id.to_string());
                }
            }
        }
        identity
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenIdentity {
    async fn resolve(&self, token: &str) -> Result<String, IdentityError> {
        if token.is_empty() {
            return Err(IdentityError::MissingCredentials);
        }
        self.tokens
            .get(token)
            .cloned()
            .ok_or(IdentityError::Unrecognized)
    }
}
