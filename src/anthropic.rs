//! Anthropic Messages API client.
//!
//! Sends one non-streaming `POST /messages` per generation and maps the
//! reply envelope (or error envelope) onto [`ServiceReply`] / [`ServiceError`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::client::{ServiceError, ServiceReply, ServiceRequest, TextGenerator, TokenUsage};

/// API version header value.
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Maximum length of a raw error body echoed into an error message.
const ERROR_BODY_MAX_LEN: usize = 200;

/// Request body for `POST /messages`.
#[derive(Debug, Serialize)]
pub struct MessagesRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub system: &'a str,
    pub messages: [WireMessage<'a>; 1],
}

/// A single conversation turn.
#[derive(Debug, Serialize)]
pub struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> MessagesRequest<'a> {
    pub fn from_request(request: &'a ServiceRequest) -> Self {
        Self {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: [WireMessage {
                role: "user",
                content: &request.user_message,
            }],
        }
    }
}

/// Successful reply envelope.
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<UsageInfo>,
}

/// Content block types. Only text is consumed.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Token usage information.
#[derive(Debug, Deserialize)]
pub struct UsageInfo {
    #[serde(default)]
    pub input_tokens: Option<u64>,
    #[serde(default)]
    pub output_tokens: Option<u64>,
}

/// Error reply envelope: `{"type": "error", "error": {"type": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl MessagesResponse {
    /// Keeps the first content block's text; later blocks are ignored.
    pub fn into_reply(self) -> ServiceReply {
        let text = match self.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => Some(text),
            _ => None,
        };
        let usage = self.usage.map(|u| TokenUsage {
            input_tokens: u.input_tokens.unwrap_or(0),
            output_tokens: u.output_tokens.unwrap_or(0),
        });
        ServiceReply {
            text,
            usage,
            stop_reason: self.stop_reason,
        }
    }
}

/// Maps a non-success HTTP status and its body to a [`ServiceError`].
pub fn classify_status(status: u16, body: &str) -> ServiceError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => match (envelope.error.kind, envelope.error.message) {
            (Some(kind), Some(message)) => format!("{}: {}", kind, message),
            (None, Some(message)) => message,
            (Some(kind), None) => kind,
            (None, None) => truncate_body(body),
        },
        Err(_) => truncate_body(body),
    };

    match status {
        401 | 403 => ServiceError::Authentication(message),
        _ => ServiceError::Status { status, message },
    }
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= ERROR_BODY_MAX_LEN {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(ERROR_BODY_MAX_LEN).collect();
        format!("{}...", head)
    }
}

/// Joins an error and its `source()` chain into one line.
///
/// reqwest's own message only names the URL; the actual cause (refused
/// connection, DNS, TLS) sits further down the chain.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// HTTP client for the Messages API.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl AnthropicClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            api_key,
            timeout,
        })
    }

    pub fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }

    fn transport_error(&self, error: reqwest::Error) -> ServiceError {
        if error.is_timeout() {
            ServiceError::Timeout(self.timeout.as_secs())
        } else {
            ServiceError::Network(error_chain(&error))
        }
    }
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    async fn generate(&self, request: &ServiceRequest) -> Result<ServiceReply, ServiceError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ServiceError::MissingCredential)?;

        let url = self.messages_url();
        let body = MessagesRequest::from_request(request);
        debug!(
            url = %url,
            model = %request.model,
            max_tokens = request.max_tokens,
            "service_request"
        );

        let response = self
            .http
            .post(url.as_str())
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        debug!(status = status.as_u16(), bytes = text.len(), "service_response");

        if !status.is_success() {
            let error = classify_status(status.as_u16(), &text);
            warn!(status = status.as_u16(), error = %error, "service_error_status");
            return Err(error);
        }

        let envelope: MessagesResponse =
            serde_json::from_str(&text).map_err(|e| ServiceError::Decode(e.to_string()))?;
        debug!(id = ?envelope.id, blocks = envelope.content.len(), "service_reply_decoded");
        Ok(envelope.into_reply())
    }
}
