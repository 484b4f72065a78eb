//! Capability seam between the exchange and the text-generation service.

use async_trait::async_trait;
use thiserror::Error;

/// Everything the service needs for one generation call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub model: String,
    pub max_tokens: u32,
    pub system: String,
    pub user_message: String,
}

/// Token accounting reported by the service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// What came back from a successful call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReply {
    /// Text of the first content block, if that block was text.
    pub text: Option<String>,
    pub usage: Option<TokenUsage>,
    pub stop_reason: Option<String>,
}

impl ServiceReply {
    /// Reply carrying only a text body.
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            text: Some(body.into()),
            ..Self::default()
        }
    }
}

/// Failure while performing the call itself.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("no API key configured (set ANTHROPIC_API_KEY or api.key in config.toml)")]
    MissingCredential,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode service reply: {0}")]
    Decode(String),
}

/// Issues a single generation request.
///
/// Implementations perform exactly one attempt per call and never retry.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &ServiceRequest) -> Result<ServiceReply, ServiceError>;
}
