//! Generation provider port.
//!
//! The provider is a black box that accepts a shaped instruction plus an
//! optional binary attachment and returns free-form text. The core never
//! retries provider calls on its own; retry is a caller decision.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub use http::HttpProvider;

/// Binary attachment forwarded to the provider (e.g. an instagram image).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Raw attachment bytes.
    pub data: Vec<u8>,
    /// Media type tag, e.g. `image/png`.
    pub media_type: String,
}

impl Attachment {
    /// Create an attachment from raw bytes and a media type.
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            data,
            media_type: media_type.into(),
        }
    }
}

/// Errors from the generation provider. Recoverable: the caller may retry
/// the whole transaction; no credits are lost.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("provider transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success HTTP status.
    #[error("provider returned status {0}")]
    Status(u16),

    /// Provider answered but the response was unusable.
    #[error("provider returned an unusable response: {0}")]
    UnexpectedResponse(String),
}

/// External text generation service.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate text for the given instruction. The sole unbounded-latency
    /// operation in a transaction; cancelling the returned future must have
    /// no effect on balances or history.
    async fn generate(
        &self,
        instruction: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, ProviderError>;
}

/// Shared provider handle.
pub type DynGenerationProvider = Arc<dyn GenerationProvider>;
