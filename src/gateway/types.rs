//! Core types for the provider gateway.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

// =============================================================================
// ATTRIBUTION
// =============================================================================

/// Attribution for cost tracking and debugging.
///
/// Every request through the gateway carries attribution so we know:
/// - Which pipeline session it's part of (session_id)
/// - Which code path triggered it (caller)
#[derive(Debug, Clone, Default)]
pub struct Attribution {
    /// Pipeline session this request belongs to (if known).
    pub session_id: Option<Uuid>,
    /// Which code path made this call, for debugging.
    /// Use a static string like "generate::idea" or "brief::repair".
    pub caller: &'static str,
}

impl Attribution {
    pub fn new(caller: &'static str) -> Self {
        Self {
            caller,
            ..Default::default()
        }
    }

    pub fn with_session(mut self, session_id: Uuid) -> Self {
        self.session_id = Some(session_id);
        self
    }
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Chat message role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Chat model specification.
///
/// The pipeline talks to two providers with different wire formats:
/// an OpenAI-compatible completions endpoint for brainstorming and repair,
/// and the Anthropic messages endpoint for evaluation and brief enhancement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChatModel {
    /// OpenAI model, e.g. "gpt-4o-mini" or a fine-tune id.
    OpenAi(String),
    /// Anthropic model, e.g. "claude-3-5-haiku-20241022".
    Anthropic(String),
}

impl ChatModel {
    pub fn openai(model_id: impl Into<String>) -> Self {
        ChatModel::OpenAi(model_id.into())
    }

    pub fn anthropic(model_id: impl Into<String>) -> Self {
        ChatModel::Anthropic(model_id.into())
    }

    pub fn model_id(&self) -> &str {
        match self {
            ChatModel::OpenAi(id) => id,
            ChatModel::Anthropic(id) => id,
        }
    }

    pub fn provider(&self) -> &'static str {
        match self {
            ChatModel::OpenAi(_) => "openai",
            ChatModel::Anthropic(_) => "anthropic",
        }
    }
}

/// Request for chat completion.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model to use.
    pub model: ChatModel,
    /// Messages in the conversation.
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 - 1.0).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Number of independent completions to sample in one request.
    ///
    /// Only the OpenAI adapter supports values above 1; the Anthropic
    /// messages endpoint rejects them as an invalid request.
    pub sample_count: u32,
    /// Whether to request JSON output.
    pub json_mode: bool,
    /// Attribution for cost tracking.
    pub attribution: Attribution,
}

impl ChatRequest {
    pub fn new(model: ChatModel, messages: Vec<Message>, attribution: Attribution) -> Self {
        Self {
            model,
            messages,
            temperature: 0.0,
            max_tokens: None,
            sample_count: 1,
            json_mode: false,
            attribution,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    pub fn samples(mut self, n: u32) -> Self {
        self.sample_count = n;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Unknown(String),
}

impl From<Option<String>> for FinishReason {
    fn from(s: Option<String>) -> Self {
        match s.as_deref() {
            Some("stop") | Some("end_turn") | Some("stop_sequence") => FinishReason::Stop,
            Some("length") | Some("max_tokens") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            Some(other) => FinishReason::Unknown(other.to_string()),
            None => FinishReason::Unknown("none".to_string()),
        }
    }
}

/// Response from chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated completion texts, one per requested sample.
    pub texts: Vec<String>,
    /// Input tokens consumed.
    pub input_tokens: u32,
    /// Output tokens generated (summed across samples).
    pub output_tokens: u32,
    /// Cost in nanodollars.
    pub cost_nanodollars: i64,
    /// Time taken for the request.
    pub latency: Duration,
    /// Why the model stopped (first choice when sampling several).
    pub finish_reason: FinishReason,
}

impl ChatResponse {
    /// The first (usually only) completion text.
    pub fn text(&self) -> &str {
        self.texts.first().map(String::as_str).unwrap_or("")
    }

    pub(crate) fn empty() -> Self {
        Self {
            texts: Vec::new(),
            input_tokens: 0,
            output_tokens: 0,
            cost_nanodollars: 0,
            latency: Duration::from_millis(0),
            finish_reason: FinishReason::Unknown("error".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_request_builder_defaults() {
        let req = ChatRequest::new(
            ChatModel::openai("gpt-4o-mini"),
            vec![Message::user("hi")],
            Attribution::new("test"),
        );
        assert_eq!(req.sample_count, 1);
        assert!(!req.json_mode);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn chat_request_samples_builder() {
        let req = ChatRequest::new(
            ChatModel::openai("gpt-4o-mini"),
            vec![Message::user("hi")],
            Attribution::new("test"),
        )
        .samples(5)
        .temperature(0.7)
        .max_tokens(400);
        assert_eq!(req.sample_count, 5);
        assert_eq!(req.max_tokens, Some(400));
    }

    #[test]
    fn model_provider_routing() {
        assert_eq!(ChatModel::openai("gpt-4-turbo").provider(), "openai");
        assert_eq!(
            ChatModel::anthropic("claude-3-haiku-20240307").provider(),
            "anthropic"
        );
        assert_eq!(ChatModel::openai("gpt-4-turbo").model_id(), "gpt-4-turbo");
    }

    #[test]
    fn finish_reason_maps_both_providers() {
        assert_eq!(
            FinishReason::from(Some("stop".to_string())),
            FinishReason::Stop
        );
        assert_eq!(
            FinishReason::from(Some("end_turn".to_string())),
            FinishReason::Stop
        );
        assert_eq!(
            FinishReason::from(Some("max_tokens".to_string())),
            FinishReason::Length
        );
        assert!(matches!(FinishReason::from(None), FinishReason::Unknown(_)));
    }

    #[test]
    fn response_text_empty_when_no_choices() {
        let resp = ChatResponse::empty();
        assert_eq!(resp.text(), "");
    }
}
