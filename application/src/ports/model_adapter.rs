//! Model adapter port
//!
//! Defines the interface for asking a language model for the next turn.
//! Vendor-specific transports implement this trait in the infrastructure
//! layer and are selected through a tagged backend enum there.

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;
use toolgate_domain::{Message, ModelResponse, RequestedToolCall, StreamEvent, ToolSpec};

/// Errors that can occur while talking to the model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No more scripted responses")]
    Exhausted,

    #[error("Timeout")]
    Timeout,

    #[error("Other error: {0}")]
    Other(String),
}

/// Handle for receiving streaming events from a model completion.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Consume the stream into a [`ModelResponse`], handing every text delta
    /// to `on_delta` as it arrives.
    ///
    /// A `Completed` event wins over anything accumulated from deltas. If the
    /// channel closes without one, the response is assembled from the text
    /// and tool-call fragments seen so far.
    pub async fn collect_response(
        mut self,
        mut on_delta: impl FnMut(&str),
    ) -> Result<ModelResponse, AdapterError> {
        let mut text = String::new();
        let mut partial_calls: BTreeMap<usize, RequestedToolCall> = BTreeMap::new();

        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => {
                    on_delta(&chunk);
                    text.push_str(&chunk);
                }
                StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments_delta,
                } => {
                    let call = partial_calls
                        .entry(index)
                        .or_insert_with(|| RequestedToolCall::new("", "", ""));
                    if let Some(id) = id {
                        call.id = id;
                    }
                    if let Some(name) = name {
                        call.name = name;
                    }
                    if let Some(fragment) = arguments_delta {
                        call.arguments_payload.push_str(&fragment);
                    }
                }
                StreamEvent::Completed(response) => return Ok(response),
                StreamEvent::Error(e) => return Err(AdapterError::RequestFailed(e)),
            }
        }

        let tool_calls: Vec<RequestedToolCall> = partial_calls.into_values().collect();
        Ok(if tool_calls.is_empty() {
            ModelResponse::from_text(text)
        } else {
            ModelResponse::with_tool_calls(text, tool_calls)
        })
    }
}

/// Capability interface of a language model backend.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Ask for the next turn given the conversation so far and the tools the
    /// model may call.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        system_prompt: Option<&str>,
    ) -> Result<ModelResponse, AdapterError>;

    /// Streaming variant of [`complete`](Self::complete).
    ///
    /// Default implementation calls `complete()` and wraps the result in a
    /// single `Completed` event.
    async fn stream_complete(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
        system_prompt: Option<&str>,
    ) -> Result<StreamHandle, AdapterError> {
        let response = self.complete(messages, tools, system_prompt).await?;
        let (tx, rx) = mpsc::channel(1);
        // Receiver may already be gone; nothing to do then
        let _ = tx.send(StreamEvent::Completed(response)).await;
        Ok(StreamHandle::new(rx))
    }
}
