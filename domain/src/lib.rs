//! Domain layer for toolgate
//!
//! This crate contains the pure policy of the tool execution gateway. It has
//! no dependencies on an async runtime, I/O or configuration sources; every
//! time-dependent state machine takes `now` as an argument.
//!
//! # Core Concepts
//!
//! ## Admission
//!
//! Before a tool handler runs, a call passes four ordered gates:
//!
//! 1. **Schema validation** ([`ParameterSchema::validate`])
//! 2. **Sanitization** ([`InputSanitizer`])
//! 3. **Permission** ([`PermissionPolicy`])
//! 4. **Rate limit / cost quota** ([`TokenBucket`], [`QuotaUsage`])
//!
//! ## Failure isolation
//!
//! Each tool has a [`CircuitBreaker`] that stops calling a handler that keeps
//! failing, then admits a single trial call after a cooldown.
//!
//! ## Errors
//!
//! Per-call failures are [`ToolError`]s with a machine-readable
//! [`ErrorCode`]; they are fed back to the model, never thrown.

pub mod circuit;
pub mod conversation;
pub mod core;
pub mod limits;
pub mod permission;
pub mod tool;

// Re-export commonly used types
pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitPermit, CircuitState};
pub use conversation::{
    ConversationError, ConversationState, Message, ModelResponse, PipelinePhase, Role,
    StopReason, StreamEvent, TokenUsage, normalize_call_ids,
};
pub use core::error::{ErrorCode, FieldError, ToolError};
pub use limits::{
    CostQuota, QuotaDenial, QuotaUsage, QuotaWindow, RateLimit, RateScope, TokenBucket,
    UsageStats,
};
pub use permission::{
    ConditionOperator, Permission, PermissionCondition, PermissionDecision, PermissionPolicy,
    RoleDefinition, UserPermissions,
};
pub use tool::{
    InputSanitizer, ParameterSchema, RequestedToolCall, SanitizerConfig, SchemaType,
    StringFormat, ToolCall, ToolResult, ToolSpec,
};
