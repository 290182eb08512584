//! Application layer for toolgate
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod services;
pub mod use_cases;

// Re-export commonly used types
pub use config::{Concurrency, EngineConfig, ExecutionParams};
pub use ports::{
    clock::{Clock, ManualClock, SystemClock},
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    model_adapter::{AdapterError, ModelAdapter, StreamHandle},
    progress::{NoPipelineProgress, PipelineProgressNotifier},
    state_store::{GatewayStateStore, InMemoryStateStore},
    tool_registry::{HandlerError, RegisteredTool, ToolHandler, ToolRegistry},
};
pub use services::{PermissionChecker, QuotaTracker, RateLimitDefaults, RateLimiter};
pub use use_cases::admit_call::{AdmissionController, AdmittedCall, DEFAULT_OPERATION};
pub use use_cases::execute_tool::ExecutionEngine;
pub use use_cases::run_pipeline::{
    PipelineError, RunPipelineInput, RunPipelineOutput, RunPipelineUseCase,
};
