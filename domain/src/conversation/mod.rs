//! Conversation domain module
//!
//! Message history, model responses and the phase machine the orchestrator
//! walks through:
//!
//! ```text
//! AwaitingModel ──tool calls──▶ ExecutingTools ──results──▶ AwaitingModel
//!       │                                                        │
//!       └──────────── final answer ──▶ Done        error ──▶ Aborted
//! ```

pub mod entities;
pub mod response;
pub mod stream;

pub use entities::{
    ConversationError, ConversationState, Message, PipelinePhase, Role, normalize_call_ids,
};
pub use response::{ModelResponse, StopReason, TokenUsage};
pub use stream::StreamEvent;
