//! The prompt generation exchange.
//!
//! Builds one request from a goal and two style choices, performs one call
//! through a [`TextGenerator`], and validates the reply into exactly
//! [`CANDIDATE_COUNT`] prompt candidates. Nothing is cached or retried.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::{ServiceError, ServiceRequest, TextGenerator};
use crate::prompt;

/// Number of candidates every successful reply must contain.
pub const CANDIDATE_COUNT: usize = 3;

/// Tone the generated prompts should be written in.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Academic,
    Creative,
}

impl Tone {
    pub const ALL: [Tone; 4] = [
        Tone::Professional,
        Tone::Casual,
        Tone::Academic,
        Tone::Creative,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Casual => "Casual",
            Tone::Academic => "Academic",
            Tone::Creative => "Creative",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Professional => Self::Casual,
            Self::Casual => Self::Academic,
            Self::Academic => Self::Creative,
            Self::Creative => Self::Professional,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Professional => Self::Creative,
            Self::Casual => Self::Professional,
            Self::Academic => Self::Casual,
            Self::Creative => Self::Academic,
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How much detail the generated prompts should carry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Concise,
    #[default]
    Balanced,
    Detailed,
}

impl DetailLevel {
    pub const ALL: [DetailLevel; 3] = [
        DetailLevel::Concise,
        DetailLevel::Balanced,
        DetailLevel::Detailed,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DetailLevel::Concise => "Concise",
            DetailLevel::Balanced => "Balanced",
            DetailLevel::Detailed => "Detailed",
        }
    }

    pub fn next(self) -> Self {
        match self {
            Self::Concise => Self::Balanced,
            Self::Balanced => Self::Detailed,
            Self::Detailed => Self::Concise,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::Concise => Self::Detailed,
            Self::Balanced => Self::Concise,
            Self::Detailed => Self::Balanced,
        }
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A validated goal plus style choices. Only constructible with a non-blank goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    goal: String,
    tone: Tone,
    detail: DetailLevel,
}

impl GenerationRequest {
    /// Fails with [`GenerationError::EmptyInput`] if the goal is blank after trimming.
    pub fn new(
        goal: impl Into<String>,
        tone: Tone,
        detail: DetailLevel,
    ) -> Result<Self, GenerationError> {
        let goal = goal.into();
        if goal.trim().is_empty() {
            return Err(GenerationError::EmptyInput);
        }
        Ok(Self { goal, tone, detail })
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn detail(&self) -> DetailLevel {
        self.detail
    }
}

/// One generated prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCandidate {
    pub title: String,
    pub content: String,
}

/// The validated reply: always exactly [`CANDIDATE_COUNT`] candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    prompts: Vec<PromptCandidate>,
}

impl GenerationResult {
    pub fn prompts(&self) -> &[PromptCandidate] {
        &self.prompts
    }
}

/// Wire shape of the reply body. Unknown keys are ignored; missing ones are errors.
#[derive(Debug, Deserialize)]
struct RawReply {
    prompts: Vec<PromptCandidate>,
}

/// Ways a reply body can fail validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FormatIssue {
    #[error("reply contained no text content")]
    MissingText,

    #[error("reply is not JSON: {0}")]
    NotJson(String),

    #[error("reply JSON has the wrong shape: {0}")]
    WrongShape(String),

    #[error("expected {expected} prompts, found {found}")]
    WrongCount { expected: usize, found: usize },

    #[error("prompt {index} has an empty {field}")]
    EmptyField { index: usize, field: &'static str },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("goal is empty")]
    EmptyInput,

    #[error("malformed reply: {0}")]
    ResponseFormat(#[from] FormatIssue),

    #[error("service call failed: {0}")]
    ServiceCall(#[source] ServiceError),
}

impl GenerationError {
    /// Message shown to the user. Format problems never expose the raw reply.
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyInput => "Please describe what you want your AI to do!".to_string(),
            Self::ResponseFormat(_) => "Error parsing response. Please try again.".to_string(),
            Self::ServiceCall(e) => format!("Error: {}", e),
        }
    }
}

/// Parses and validates a raw reply body.
pub fn parse_reply(body: &str) -> Result<GenerationResult, FormatIssue> {
    let raw: RawReply = serde_json::from_str(body).map_err(|e| {
        if e.is_data() {
            FormatIssue::WrongShape(e.to_string())
        } else {
            FormatIssue::NotJson(e.to_string())
        }
    })?;

    if raw.prompts.len() != CANDIDATE_COUNT {
        return Err(FormatIssue::WrongCount {
            expected: CANDIDATE_COUNT,
            found: raw.prompts.len(),
        });
    }

    for (i, candidate) in raw.prompts.iter().enumerate() {
        let index = i + 1;
        if candidate.title.trim().is_empty() {
            return Err(FormatIssue::EmptyField {
                index,
                field: "title",
            });
        }
        if candidate.content.trim().is_empty() {
            return Err(FormatIssue::EmptyField {
                index,
                field: "content",
            });
        }
    }

    Ok(GenerationResult {
        prompts: raw.prompts,
    })
}

/// Fixed call parameters, supplied from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeSettings {
    pub model: String,
    pub max_tokens: u32,
}

/// Lifecycle of a single exchange as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExchangeState {
    #[default]
    Idle,
    InFlight,
    Succeeded,
    Failed,
}

impl ExchangeState {
    pub fn label(&self) -> &'static str {
        match self {
            ExchangeState::Idle => "IDLE",
            ExchangeState::InFlight => "GENERATING",
            ExchangeState::Succeeded => "DONE",
            ExchangeState::Failed => "ERROR",
        }
    }
}

/// Performs generation requests against an injected [`TextGenerator`].
#[derive(Clone)]
pub struct PromptExchange {
    generator: Arc<dyn TextGenerator>,
    settings: ExchangeSettings,
}

impl PromptExchange {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: ExchangeSettings) -> Self {
        Self {
            generator,
            settings,
        }
    }

    /// Validates the goal, then runs one exchange.
    pub async fn generate(
        &self,
        goal: &str,
        tone: Tone,
        detail: DetailLevel,
    ) -> Result<GenerationResult, GenerationError> {
        let request = GenerationRequest::new(goal, tone, detail)?;
        self.execute(&request).await
    }

    /// Runs one exchange for an already-validated request.
    pub async fn execute(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let call = self.service_request(request);
        info!(
            tone = %request.tone(),
            detail = %request.detail(),
            goal_chars = request.goal().chars().count(),
            model = %call.model,
            "generation_start"
        );

        let reply = self.generator.generate(&call).await.map_err(|e| {
            warn!(error = %e, "generation_failed");
            GenerationError::ServiceCall(e)
        })?;

        if let Some(usage) = reply.usage {
            info!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "generation_usage"
            );
        }
        if reply.stop_reason.as_deref() == Some("max_tokens") {
            warn!(max_tokens = call.max_tokens, "reply_truncated");
        }

        let body = reply.text.ok_or_else(|| {
            warn!("generation_failed: no text content");
            FormatIssue::MissingText
        })?;

        let result = parse_reply(&body).inspect_err(|issue| {
            debug!(raw = %body, "unparseable_reply");
            warn!(error = %issue, "generation_failed");
        })?;

        info!(candidates = result.prompts().len(), "generation_succeeded");
        Ok(result)
    }

    /// The exact call that [`execute`](Self::execute) would issue.
    pub fn service_request(&self, request: &GenerationRequest) -> ServiceRequest {
        ServiceRequest {
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            system: prompt::system_instruction(request.tone(), request.detail()),
            user_message: prompt::user_message(request.goal()),
        }
    }
}
