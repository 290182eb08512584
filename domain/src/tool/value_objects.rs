//! Tool domain value objects: the output side of the pipeline.
//!
//! Every call the model issues ends up as exactly one [`ToolResult`], whether
//! the handler ran or an admission gate turned it away. Failed results carry
//! a [`ToolError`] whose code tells the model (and the caller) what happened.

use crate::core::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Id of the call this result answers
    pub call_id: String,
    /// Name of the tool that was requested
    pub tool_name: String,
    /// Whether the handler ran and succeeded
    pub success: bool,
    /// Handler output (for successful execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error information (for failed execution)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    /// Wall-clock latency in milliseconds
    #[serde(default)]
    pub latency_ms: u64,
    /// Cost charged against the caller's quota
    #[serde(default)]
    pub cost: f64,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(call_id: impl Into<String>, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: true,
            output: Some(output),
            error: None,
            latency_ms: 0,
            cost: 0.0,
        }
    }

    /// Create a failed result
    pub fn failure(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        error: ToolError,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            success: false,
            output: None,
            error: Some(error),
            latency_ms: 0,
            cost: 0.0,
        }
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    pub fn error(&self) -> Option<&ToolError> {
        self.error.as_ref()
    }

    /// Content of the tool-role message that answers this call.
    ///
    /// String outputs are passed through verbatim; other outputs are JSON
    /// encoded. Failures become `{"error": {...}}` so the model can read the
    /// code, the itemized fields and any retry hint.
    pub fn to_message_content(&self) -> String {
        if let Some(error) = &self.error {
            return serde_json::json!({ "error": error }).to_string();
        }
        match &self.output {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::{ErrorCode, FieldError};
    use serde_json::json;

    #[test]
    fn test_tool_result_success() {
        let result = ToolResult::success("call_1", "echo", json!("hello"))
            .with_latency(12)
            .with_cost(0.25);

        assert!(result.is_success());
        assert_eq!(result.output(), Some(&json!("hello")));
        assert!(result.error().is_none());
        assert_eq!(result.latency_ms, 12);
        assert_eq!(result.to_message_content(), "hello");
    }

    #[test]
    fn test_structured_output_is_json_encoded() {
        let result = ToolResult::success("c", "stats", json!({"count": 3}));
        assert_eq!(result.to_message_content(), r#"{"count":3}"#);
    }

    #[test]
    fn test_failure_content_exposes_error_code() {
        let result = ToolResult::failure(
            "call_2",
            "github/createIssues",
            ToolError::validation(vec![FieldError::new("$.title", "is required")]),
        );

        assert!(!result.is_success());
        assert!(result.output().is_none());
        assert_eq!(result.error().unwrap().code, ErrorCode::ValidationFailed);

        let content: Value = serde_json::from_str(&result.to_message_content()).unwrap();
        assert_eq!(content["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(content["error"]["fields"][0]["path"], "$.title");
    }
}
