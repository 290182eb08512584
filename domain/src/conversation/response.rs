//! Model response types.
//!
//! A model turn yields either a final answer (no tool calls) or a batch of
//! [`RequestedToolCall`]s whose raw argument payloads still have to be
//! parsed and admitted.

use crate::tool::entities::RequestedToolCall;
use serde::{Deserialize, Serialize};

/// Reason the model stopped generating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response.
    EndTurn,
    /// The model wants tools executed.
    ToolUse,
    /// Hit the token limit; the response may be truncated.
    MaxTokens,
    /// Provider-specific stop reason.
    Other(String),
}

/// Token accounting reported by the model adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// One model completion.
///
/// ```
/// use toolgate_domain::conversation::response::ModelResponse;
/// use toolgate_domain::tool::RequestedToolCall;
///
/// let answer = ModelResponse::from_text("All done.");
/// assert!(!answer.has_tool_calls());
///
/// let request = ModelResponse::with_tool_calls(
///     "Let me check.",
///     vec![RequestedToolCall::new("call_1", "current_time", "{}")],
/// );
/// assert!(request.has_tool_calls());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<RequestedToolCall>,
    #[serde(default)]
    pub usage: TokenUsage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

impl ModelResponse {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: text.into(),
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            stop_reason: Some(StopReason::EndTurn),
        }
    }

    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<RequestedToolCall>) -> Self {
        Self {
            content: text.into(),
            tool_calls,
            usage: TokenUsage::default(),
            stop_reason: Some(StopReason::ToolUse),
        }
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}
