//! Error taxonomy for tool calls.
//!
//! Every gate in the pipeline (validation, permission, rate limit, quota,
//! circuit breaker, handler, timeout) reports its failure as a [`ToolError`]
//! tagged with a machine-distinguishable [`ErrorCode`]. These errors are
//! *recoverable*: they are wrapped into a failed `ToolResult` and handed back
//! to the model as the content of the matching tool message.
//!
//! | Code | Raised by | Extra fields |
//! |------|-----------|--------------|
//! | `VALIDATION_FAILED` | schema validator, payload parser | `fields` |
//! | `PERMISSION_DENIED` | permission checker | - |
//! | `RATE_LIMITED` | token buckets | `retry_after_ms` |
//! | `QUOTA_EXCEEDED` | cost quota tracker | `remaining`, `reset_at` |
//! | `HANDLER_FAILED` | tool handler | - |
//! | `TIMEOUT` | execution engine | - |
//! | `CIRCUIT_OPEN` | circuit breaker | `retry_after_ms` |
//! | `TOOL_NOT_FOUND` | registry lookup | - |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Machine-readable reason code of a failed tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationFailed,
    PermissionDenied,
    RateLimited,
    QuotaExceeded,
    HandlerFailed,
    Timeout,
    CircuitOpen,
    ToolNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::PermissionDenied => "PERMISSION_DENIED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::HandlerFailed => "HANDLER_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::CircuitOpen => "CIRCUIT_OPEN",
            ErrorCode::ToolNotFound => "TOOL_NOT_FOUND",
        }
    }

    /// True for denials produced before the handler was ever invoked.
    pub fn is_admission_denial(&self) -> bool {
        matches!(
            self,
            ErrorCode::ValidationFailed
                | ErrorCode::PermissionDenied
                | ErrorCode::RateLimited
                | ErrorCode::QuotaExceeded
                | ErrorCode::ToolNotFound
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema violation, located by a JSON-path-like field path
/// (`$`, `$.repo`, `$.labels[2]`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Error describing why a tool call did not produce a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    /// Itemized schema violations (validation only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldError>,
    /// How long the caller should wait before retrying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
    /// Remaining quota headroom.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remaining: Option<f64>,
    /// When the exhausted quota window resets.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            fields: Vec::new(),
            retry_after_ms: None,
            remaining: None,
            reset_at: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        // Round up so a zero-ms hint never tells the caller to retry immediately.
        let ms = retry_after.as_millis().max(1);
        self.retry_after_ms = Some(u64::try_from(ms).unwrap_or(u64::MAX));
        self
    }

    pub fn validation(fields: Vec<FieldError>) -> Self {
        let summary = fields
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        Self {
            fields,
            ..Self::new(
                ErrorCode::ValidationFailed,
                format!("Invalid arguments: {}", summary),
            )
        }
    }

    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::validation(vec![FieldError::new(
            "$",
            format!("arguments are not valid JSON: {}", reason.into()),
        )])
    }

    pub fn permission_denied(tool: &str, operation: &str) -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("Permission denied: '{}' on tool '{}'", operation, tool),
        )
    }

    pub fn rate_limited(scope: &str, retry_after: Duration) -> Self {
        Self::new(
            ErrorCode::RateLimited,
            format!("Rate limit exceeded for scope '{}'", scope),
        )
        .with_retry_after(retry_after)
    }

    pub fn quota_exceeded(window: &str, remaining: f64, reset_at: DateTime<Utc>) -> Self {
        Self {
            remaining: Some(remaining),
            reset_at: Some(reset_at),
            ..Self::new(
                ErrorCode::QuotaExceeded,
                format!(
                    "{} cost quota exceeded ({:.4} remaining, resets at {})",
                    window,
                    remaining,
                    reset_at.to_rfc3339()
                ),
            )
        }
    }

    pub fn handler_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::HandlerFailed, message)
    }

    pub fn timeout(tool: &str, after: Duration) -> Self {
        Self::new(
            ErrorCode::Timeout,
            format!("Tool '{}' timed out after {}ms", tool, after.as_millis()),
        )
    }

    pub fn circuit_open(tool: &str, retry_after: Duration) -> Self {
        Self::new(
            ErrorCode::CircuitOpen,
            format!("Circuit open for tool '{}'", tool),
        )
        .with_retry_after(retry_after)
    }

    pub fn not_found(tool: &str) -> Self {
        Self::new(
            ErrorCode::ToolNotFound,
            format!("Unknown or unavailable tool: {}", tool),
        )
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ToolError {}
