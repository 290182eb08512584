//! Tool domain entities

use super::schema::ParameterSchema;
use crate::core::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Machine-readable description of a callable tool.
///
/// Owned by the registry and immutable once registered. The handler that
/// actually runs the tool is kept beside the spec by the registry port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name (e.g. "github/createIssues")
    pub name: String,
    /// Human-readable description shown to the model
    pub description: String,
    /// Schema for the argument object
    #[serde(default = "ParameterSchema::object")]
    pub parameters: ParameterSchema,
    /// Estimated cost charged against the caller's quota per attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    /// Per-call timeout overriding the engine default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ToolSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema::object(),
            estimated_cost: None,
            timeout_ms: None,
        }
    }

    pub fn with_parameters(mut self, parameters: ParameterSchema) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_estimated_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Provider-neutral tool description (`name`, `description`, `input_schema`).
    pub fn to_api_schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": self.description,
            "input_schema": self.parameters,
        })
    }
}

/// A tool call exactly as the model issued it: the arguments are still a raw
/// JSON payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments_payload: String,
}

impl RequestedToolCall {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments_payload: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments_payload: arguments_payload.into(),
        }
    }
}

/// A parsed call to a tool with arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier, unique within a turn
    pub id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Argument object
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tool_name: tool_name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Parse a model-issued call. An empty or `null` payload means "no
    /// arguments"; anything else must be a JSON object.
    pub fn from_requested(requested: &RequestedToolCall) -> Result<Self, ToolError> {
        let payload = requested.arguments_payload.trim();
        let arguments = if payload.is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(payload) {
                Ok(Value::Object(map)) => map,
                Ok(Value::Null) => Map::new(),
                Ok(_) => {
                    return Err(ToolError::validation(vec![
                        crate::core::error::FieldError::new("$", "arguments must be a JSON object"),
                    ]));
                }
                Err(e) => return Err(ToolError::invalid_payload(e.to_string())),
            }
        };

        Ok(Self {
            id: requested.id.clone(),
            tool_name: requested.name.clone(),
            arguments,
        })
    }

    /// Arguments as a JSON value (for validation and handler invocation).
    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }

    /// Get a string argument
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }
}
