//! Conversation domain entities

use crate::tool::entities::RequestedToolCall;
use crate::tool::value_objects::ToolResult;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A message in a conversation (Entity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Calls requested by an assistant message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<RequestedToolCall>,
    /// Call answered by a tool message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    pub fn assistant_with_calls(
        content: impl Into<String>,
        tool_calls: Vec<RequestedToolCall>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// Where the orchestrator is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    AwaitingModel,
    ExecutingTools,
    Done,
    Aborted,
}

impl PipelinePhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelinePhase::Done | PipelinePhase::Aborted)
    }
}

impl std::fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PipelinePhase::AwaitingModel => "awaiting_model",
            PipelinePhase::ExecutingTools => "executing_tools",
            PipelinePhase::Done => "done",
            PipelinePhase::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    #[error("Conversation is {0}; no further messages accepted")]
    Closed(PipelinePhase),

    #[error("Tool results for the previous turn are still pending")]
    ResultsPending,

    #[error("Duplicate tool call id in one turn: {0}")]
    DuplicateCallId(String),

    #[error("Tool result for unknown or already answered call: {0}")]
    UnexpectedResult(String),

    #[error("No tool result for call: {0}")]
    MissingResult(String),
}

/// Replace empty or repeated call ids with `call_<turn>_<index>` so every id
/// is unique within the turn.
pub fn normalize_call_ids(turn: u32, calls: &mut [RequestedToolCall]) {
    let mut seen = HashSet::new();
    for (index, call) in calls.iter_mut().enumerate() {
        if call.id.trim().is_empty() || !seen.insert(call.id.clone()) {
            let mut candidate = format!("call_{}_{}", turn, index);
            while !seen.insert(candidate.clone()) {
                candidate.push('_');
            }
            call.id = candidate;
        }
    }
}

/// Message history and turn bookkeeping for one `execute()` run.
///
/// Enforces that every tool message answers exactly one call id of the
/// immediately preceding assistant message.
#[derive(Debug, Clone)]
pub struct ConversationState {
    messages: Vec<Message>,
    turns: u32,
    phase: PipelinePhase,
    pending: Vec<String>,
}

impl ConversationState {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(prompt)],
            turns: 0,
            phase: PipelinePhase::AwaitingModel,
            pending: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn turns(&self) -> u32 {
        self.turns
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    fn ensure_open(&self) -> Result<(), ConversationError> {
        if self.phase.is_terminal() {
            return Err(ConversationError::Closed(self.phase));
        }
        if !self.pending.is_empty() {
            return Err(ConversationError::ResultsPending);
        }
        Ok(())
    }

    /// Start a model round trip. Returns the new turn number.
    pub fn begin_turn(&mut self) -> Result<u32, ConversationError> {
        self.ensure_open()?;
        self.turns += 1;
        self.phase = PipelinePhase::AwaitingModel;
        Ok(self.turns)
    }

    /// Append the assistant message that requested `calls`.
    pub fn record_tool_requests(
        &mut self,
        content: impl Into<String>,
        calls: Vec<RequestedToolCall>,
    ) -> Result<(), ConversationError> {
        self.ensure_open()?;
        let mut seen = HashSet::new();
        for call in &calls {
            if !seen.insert(call.id.as_str()) {
                return Err(ConversationError::DuplicateCallId(call.id.clone()));
            }
        }

        self.pending = calls.iter().map(|c| c.id.clone()).collect();
        self.messages
            .push(Message::assistant_with_calls(content, calls));
        self.phase = PipelinePhase::ExecutingTools;
        Ok(())
    }

    /// Append one tool message per result. `results` must answer every
    /// pending call exactly once.
    pub fn record_tool_results(&mut self, results: &[ToolResult]) -> Result<(), ConversationError> {
        if self.phase != PipelinePhase::ExecutingTools {
            return Err(ConversationError::Closed(self.phase));
        }

        let mut outstanding: HashSet<&str> = self.pending.iter().map(String::as_str).collect();
        for result in results {
            if !outstanding.remove(result.call_id.as_str()) {
                return Err(ConversationError::UnexpectedResult(result.call_id.clone()));
            }
        }
        if let Some(missing) = self.pending.iter().find(|id| outstanding.contains(id.as_str())) {
            return Err(ConversationError::MissingResult(missing.clone()));
        }

        self.messages.extend(
            results
                .iter()
                .map(|r| Message::tool(r.call_id.clone(), r.to_message_content())),
        );
        self.pending.clear();
        self.phase = PipelinePhase::AwaitingModel;
        Ok(())
    }

    /// Append the final assistant answer and close the conversation.
    pub fn finish(&mut self, content: impl Into<String>) -> Result<(), ConversationError> {
        self.ensure_open()?;
        self.messages.push(Message::assistant(content));
        self.phase = PipelinePhase::Done;
        Ok(())
    }

    pub fn abort(&mut self) {
        self.phase = PipelinePhase::Aborted;
    }
}
