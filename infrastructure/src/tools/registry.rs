//! Static tool registry
//!
//! [`StaticToolRegistry`] holds tools registered at startup and implements
//! the [`ToolRegistry`] port. Lookups clone the spec and the handler `Arc`,
//! so callers never hold a borrow into the registry.
//!
//! # Usage
//!
//! ```ignore
//! use toolgate_infrastructure::tools::StaticToolRegistry;
//!
//! let mut registry = StaticToolRegistry::with_builtins();
//! registry.insert(my_tool);
//! registry.apply_overrides(&config.tools);
//!
//! assert!(registry.has_tool("echo"));
//! ```

use super::builtin::builtin_tools;
use crate::config::FileToolOverride;
use std::collections::{BTreeMap, HashMap};
use toolgate_application::{RegisteredTool, ToolRegistry};
use toolgate_domain::ToolSpec;

#[derive(Debug, Default)]
pub struct StaticToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl StaticToolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in tools
    pub fn with_builtins() -> Self {
        builtin_tools()
            .into_iter()
            .fold(Self::new(), |registry, tool| registry.register(tool))
    }

    /// Register a tool (builder style)
    pub fn register(mut self, tool: RegisteredTool) -> Self {
        self.insert(tool);
        self
    }

    /// Register a tool, returning the one it replaced
    pub fn insert(&mut self, tool: RegisteredTool) -> Option<RegisteredTool> {
        let name = tool.name().to_string();
        tracing::debug!(tool = %name, "Registered tool");
        let replaced = self.tools.insert(name, tool);
        if let Some(old) = &replaced {
            tracing::warn!(tool = %old.name(), "Tool registered twice, keeping the later one");
        }
        replaced
    }

    /// Apply cost and timeout overrides. Returns the names that matched no tool.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, FileToolOverride>,
    ) -> Vec<String> {
        let mut unknown = Vec::new();
        for (name, tool_override) in overrides {
            let Some(tool) = self.tools.get_mut(name) else {
                unknown.push(name.clone());
                continue;
            };
            if let Some(cost) = tool_override.estimated_cost {
                tool.spec.estimated_cost = Some(cost);
            }
            if let Some(secs) = tool_override.timeout_secs {
                tool.spec.timeout_ms = Some(secs.saturating_mul(1000));
            }
        }
        unknown
    }

    /// Specs of all tools, sorted by name
    pub fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|t| t.spec.clone()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl ToolRegistry for StaticToolRegistry {
    fn get_tool_by_name(&self, name: &str) -> Option<RegisteredTool> {
        self.tools.get(name).cloned()
    }

    fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}
