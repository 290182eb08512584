//! Streaming events for model completions.

use super::response::ModelResponse;

/// An event in a streaming model response.
///
/// `Completed` and `Error` are terminal. Adapters that cannot stream emit a
/// single `Completed` carrying the whole response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Delta(String),
    /// Incremental tool call data; `index` identifies the call within the
    /// response, fragments of `arguments_delta` must be concatenated.
    ToolCallDelta {
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments_delta: Option<String>,
    },
    /// The full response (signals stream end).
    Completed(ModelResponse),
    /// An error that occurred during streaming.
    Error(String),
}

impl StreamEvent {
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            StreamEvent::Completed(response) => Some(&response.content),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}
