//! Scripted model adapter
//!
//! Replays a fixed transcript of model turns from JSON. Used for dry runs of
//! a gateway configuration and for end-to-end tests without a live model.
//!
//! ```json
//! [
//!   { "content": "", "tool_calls": [
//!       { "id": "c1", "name": "echo", "arguments": { "text": "hi" } }
//!   ] },
//!   { "content": "The tool said hi." }
//! ]
//! ```
//!
//! `arguments` may also be a string, which is passed to the gateway as the
//! raw payload (so malformed JSON can be scripted too). The transcript may be
//! wrapped as `{ "turns": [...] }`.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::mpsc;
use toolgate_application::{AdapterError, ModelAdapter, StreamHandle};
use toolgate_domain::{
    Message, ModelResponse, RequestedToolCall, StreamEvent, TokenUsage, ToolSpec,
};
use tracing::debug;

#[derive(Error, Debug)]
pub enum ScriptError {
    #[error("Could not read transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid transcript: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Transcript has no turns")]
    Empty,
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptedToolCall {
    #[serde(default)]
    id: String,
    name: String,
    #[serde(default)]
    arguments: Value,
}

impl ScriptedToolCall {
    fn into_requested(self) -> RequestedToolCall {
        let payload = match self.arguments {
            Value::String(raw) => raw,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        RequestedToolCall::new(self.id, self.name, payload)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ScriptedTurn {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ScriptedToolCall>,
    #[serde(default)]
    usage: TokenUsage,
}

impl ScriptedTurn {
    fn into_response(self) -> ModelResponse {
        let calls: Vec<RequestedToolCall> = self
            .tool_calls
            .into_iter()
            .map(ScriptedToolCall::into_requested)
            .collect();
        let response = if calls.is_empty() {
            ModelResponse::from_text(self.content)
        } else {
            ModelResponse::with_tool_calls(self.content, calls)
        };
        response.with_usage(self.usage)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Transcript {
    Bare(Vec<ScriptedTurn>),
    Wrapped { turns: Vec<ScriptedTurn> },
}

/// Model adapter that answers from a transcript, one entry per call.
///
/// Returns [`AdapterError::Exhausted`] once every entry has been played.
#[derive(Debug)]
pub struct ScriptedModelAdapter {
    responses: Vec<ModelResponse>,
    next: AtomicUsize,
}

impl ScriptedModelAdapter {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses,
            next: AtomicUsize::new(0),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let turns = match serde_json::from_str::<Transcript>(json)? {
            Transcript::Bare(turns) | Transcript::Wrapped { turns } => turns,
        };
        if turns.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(Self::new(
            turns.into_iter().map(ScriptedTurn::into_response).collect(),
        ))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Turns not yet played.
    pub fn remaining(&self) -> usize {
        self.responses
            .len()
            .saturating_sub(self.next.load(Ordering::SeqCst))
    }

    fn next_response(&self) -> Result<ModelResponse, AdapterError> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let response = self
            .responses
            .get(index)
            .cloned()
            .ok_or(AdapterError::Exhausted)?;
        debug!(
            "Scripted turn {}/{} ({} tool calls)",
            index + 1,
            self.responses.len(),
            response.tool_calls.len()
        );
        Ok(response)
    }
}

#[async_trait]
impl ModelAdapter for ScriptedModelAdapter {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolSpec],
        _system_prompt: Option<&str>,
    ) -> Result<ModelResponse, AdapterError> {
        self.next_response()
    }

    /// Streams the content word by word, then the complete response.
    async fn stream_complete(
        &self,
        _messages: &[Message],
        _tools: &[ToolSpec],
        _system_prompt: Option<&str>,
    ) -> Result<StreamHandle, AdapterError> {
        let response = self.next_response()?;
        let mut events: Vec<StreamEvent> = response
            .content
            .split_inclusive(' ')
            .map(|word| StreamEvent::Delta(word.to_string()))
            .collect();
        events.push(StreamEvent::Completed(response));

        let (tx, rx) = mpsc::channel(events.len());
        for event in events {
            // Capacity covers every event, so this never waits
            if tx.send(event).await.is_err() {
                break;
            }
        }
        Ok(StreamHandle::new(rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = r#"[
        { "content": "", "tool_calls": [
            { "id": "c1", "name": "echo", "arguments": { "text": "hi" } },
            { "name": "echo", "arguments": "{not json" }
        ], "usage": { "input_tokens": 12, "output_tokens": 3 } },
        { "content": "All done here" }
    ]"#;

    #[tokio::test]
    async fn test_replays_turns_then_exhausts() {
        let adapter = ScriptedModelAdapter::from_json(TRANSCRIPT).unwrap();
        assert_eq!(adapter.remaining(), 2);

        let first = adapter.complete(&[], &[], None).await.unwrap();
        assert_eq!(first.tool_calls.len(), 2);
        assert_eq!(first.tool_calls[0].arguments_payload, r#"{"text":"hi"}"#);
        assert_eq!(first.tool_calls[1].id, "");
        assert_eq!(first.tool_calls[1].arguments_payload, "{not json");
        assert_eq!(first.usage.total(), 15);

        let second = adapter.complete(&[], &[], None).await.unwrap();
        assert!(!second.has_tool_calls());
        assert_eq!(adapter.remaining(), 0);

        let err = adapter.complete(&[], &[], None).await.unwrap_err();
        assert_eq!(err, AdapterError::Exhausted);
    }

    #[tokio::test]
    async fn test_stream_emits_word_deltas() {
        let adapter =
            ScriptedModelAdapter::from_json(r#"{"turns": [{"content": "All done here"}]}"#)
                .unwrap();
        let mut chunks = Vec::new();
        let response = adapter
            .stream_complete(&[], &[], None)
            .await
            .unwrap()
            .collect_response(|chunk| chunks.push(chunk.to_string()))
            .await
            .unwrap();

        assert_eq!(chunks, vec!["All ", "done ", "here"]);
        assert_eq!(response.content, "All done here");
    }

    #[test]
    fn test_rejects_empty_and_invalid_transcripts() {
        assert!(matches!(
            ScriptedModelAdapter::from_json("[]"),
            Err(ScriptError::Empty)
        ));
        assert!(matches!(
            ScriptedModelAdapter::from_json("{\"oops\": 1}"),
            Err(ScriptError::Parse(_))
        ));
    }

    #[test]
    fn test_from_file_reports_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = ScriptedModelAdapter::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ScriptError::Io { .. }));
        assert!(err.to_string().contains("missing.json"));
    }
}
