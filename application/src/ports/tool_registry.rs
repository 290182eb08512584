//! Tool registry port
//!
//! The registry owns tool specifications and the handlers that run them.
//! How specs are derived (hand-written, generated from API descriptions) is
//! the adapter's business; the gateway only looks tools up by name.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use toolgate_domain::ToolSpec;

/// Error returned by a tool implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

/// The callable behind a tool.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with already admitted (validated, sanitized) arguments.
    async fn invoke(&self, arguments: Value) -> Result<Value, HandlerError>;
}

/// A spec together with its handler.
#[derive(Clone)]
pub struct RegisteredTool {
    pub spec: ToolSpec,
    pub handler: Arc<dyn ToolHandler>,
}

impl RegisteredTool {
    pub fn new(spec: ToolSpec, handler: Arc<dyn ToolHandler>) -> Self {
        Self { spec, handler }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Port for tool lookup
pub trait ToolRegistry: Send + Sync {
    fn get_tool_by_name(&self, name: &str) -> Option<RegisteredTool>;

    /// Names of all registered tools, sorted.
    fn tool_names(&self) -> Vec<String>;

    fn has_tool(&self, name: &str) -> bool {
        self.get_tool_by_name(name).is_some()
    }
}
