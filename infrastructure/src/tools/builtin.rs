//! Built-in tools
//!
//! A small set of tools that need no external service, available to every
//! deployment:
//!
//! - `echo`: returns its `text` argument
//! - `current_time`: the gateway's clock in UTC
//! - `sleep`: waits `ms` milliseconds (useful for exercising timeouts)

use super::handler::FnToolHandler;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolgate_application::{HandlerError, RegisteredTool, ToolHandler};
use toolgate_domain::{ParameterSchema, ToolSpec};

pub const ECHO: &str = "echo";
pub const CURRENT_TIME: &str = "current_time";
pub const SLEEP: &str = "sleep";

/// Longest wait the `sleep` tool accepts.
pub const MAX_SLEEP_MS: u64 = 60_000;

/// All built-in tools.
pub fn builtin_tools() -> Vec<RegisteredTool> {
    vec![echo_tool(), current_time_tool(), sleep_tool()]
}

pub fn echo_tool() -> RegisteredTool {
    let spec = ToolSpec::new(ECHO, "Return the given text unchanged").with_parameters(
        ParameterSchema::object()
            .with_property("text", ParameterSchema::string(), true)
            .deny_additional(),
    );
    let handler = FnToolHandler::new(|args: Value| {
        args.get("text")
            .cloned()
            .ok_or_else(|| HandlerError::InvalidArguments("text is required".to_string()))
    });
    RegisteredTool::new(spec, Arc::new(handler))
}

pub fn current_time_tool() -> RegisteredTool {
    let spec = ToolSpec::new(CURRENT_TIME, "Current date and time in UTC")
        .with_parameters(ParameterSchema::object().deny_additional());
    let handler = FnToolHandler::new(|_args: Value| {
        let now = chrono::Utc::now();
        Ok(json!({
            "utc": now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "unix_ms": now.timestamp_millis(),
        }))
    });
    RegisteredTool::new(spec, Arc::new(handler))
}

pub fn sleep_tool() -> RegisteredTool {
    let spec = ToolSpec::new(SLEEP, "Wait for the given number of milliseconds").with_parameters(
        ParameterSchema::object()
            .with_property(
                "ms",
                ParameterSchema::integer().with_range(Some(0.0), Some(MAX_SLEEP_MS as f64)),
                true,
            )
            .deny_additional(),
    );
    RegisteredTool::new(spec, Arc::new(SleepHandler))
}

struct SleepHandler;

#[async_trait]
impl ToolHandler for SleepHandler {
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError> {
        let ms = arguments
            .get("ms")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                HandlerError::InvalidArguments("ms must be a non-negative integer".to_string())
            })?
            .min(MAX_SLEEP_MS);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!({ "slept_ms": ms }))
    }
}
