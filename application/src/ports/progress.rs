//! Progress notification port
//!
//! Defines the callbacks the orchestrator fires while a pipeline runs.
//! Every method has a no-op default so implementations only override what
//! they display.

use toolgate_domain::{ToolCall, ToolResult};

pub trait PipelineProgressNotifier: Send + Sync {
    /// A model round trip is starting.
    fn on_turn_start(&self, _turn: u32, _max_turns: u32) {}

    /// A text chunk arrived from a streaming model.
    fn on_model_delta(&self, _chunk: &str) {}

    /// A parsed call is about to go through admission.
    fn on_tool_call(&self, _call: &ToolCall) {}

    /// A call finished (admitted and executed, or denied).
    fn on_tool_result(&self, _result: &ToolResult) {}

    /// The pipeline stopped after `turns` turns.
    fn on_complete(&self, _turns: u32, _success: bool) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoPipelineProgress;

impl PipelineProgressNotifier for NoPipelineProgress {}
