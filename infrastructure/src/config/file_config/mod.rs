//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod access;
mod engine;
mod limits;
mod pipeline;

pub use access::{FileRoleConfig, FileUserConfig, build_permission_policy};
pub use engine::{FileEngineConfig, FileToolOverride};
pub use limits::{FileQuotasConfig, FileRateLimit, FileRateLimitsConfig};
pub use pipeline::FilePipelineConfig;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;
use toolgate_domain::permission::default_roles;
use toolgate_domain::{InputSanitizer, PermissionPolicy, SanitizerConfig};

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigValidationError {
    #[error("{field} cannot be 0")]
    ZeroTimeout { field: String },

    #[error("pipeline.max_turns must be at least 1")]
    ZeroMaxTurns,

    #[error("engine.failure_threshold must be at least 1")]
    ZeroFailureThreshold,

    #[error("{field}: window_secs cannot be 0")]
    ZeroRateWindow { field: String },

    #[error("{field} cannot be negative (got {value})")]
    NegativeCost { field: String, value: f64 },

    #[error("role '{role}' inherits unknown role '{parent}'")]
    UnknownParentRole { role: String, parent: String },

    #[error("user '{user}' has unknown role '{role}'")]
    UnknownUserRole { user: String, role: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Conversation loop settings
    pub pipeline: FilePipelineConfig,
    /// Timeout and circuit breaker settings
    pub engine: FileEngineConfig,
    /// Argument sanitization settings
    pub sanitizer: SanitizerConfig,
    /// Token-bucket limits per scope
    pub rate_limits: FileRateLimitsConfig,
    /// Cost ceilings
    pub quotas: FileQuotasConfig,
    /// Extra or replacement roles
    pub roles: BTreeMap<String, FileRoleConfig>,
    /// User permission records
    pub users: BTreeMap<String, FileUserConfig>,
    /// Per-tool cost and timeout overrides
    pub tools: BTreeMap<String, FileToolOverride>,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();

        if self.pipeline.max_turns == 0 {
            issues.push(ConfigValidationError::ZeroMaxTurns);
        }
        if self.pipeline.per_turn_timeout_secs == Some(0) {
            issues.push(ConfigValidationError::ZeroTimeout {
                field: "pipeline.per_turn_timeout_secs".to_string(),
            });
        }
        if self.engine.default_timeout_secs == 0 {
            issues.push(ConfigValidationError::ZeroTimeout {
                field: "engine.default_timeout_secs".to_string(),
            });
        }
        if self.engine.failure_threshold == 0 {
            issues.push(ConfigValidationError::ZeroFailureThreshold);
        }
        for (name, tool) in &self.tools {
            if tool.timeout_secs == Some(0) {
                issues.push(ConfigValidationError::ZeroTimeout {
                    field: format!("tools.{}.timeout_secs", name),
                });
            }
            if let Some(cost) = tool.estimated_cost.filter(|c| *c < 0.0) {
                issues.push(ConfigValidationError::NegativeCost {
                    field: format!("tools.{}.estimated_cost", name),
                    value: cost,
                });
            }
        }

        for (field, limit) in self.rate_limits.all_limits() {
            if limit.window_secs == 0 {
                issues.push(ConfigValidationError::ZeroRateWindow { field });
            }
        }
        for (field, value) in self.quotas.all_ceilings() {
            if value < 0.0 {
                issues.push(ConfigValidationError::NegativeCost { field, value });
            }
        }

        let known_roles: HashSet<String> = default_roles()
            .into_iter()
            .map(|r| r.name)
            .chain(self.roles.keys().cloned())
            .collect();
        for (name, role) in &self.roles {
            for parent in role.inherits.iter().filter(|p| !known_roles.contains(*p)) {
                issues.push(ConfigValidationError::UnknownParentRole {
                    role: name.clone(),
                    parent: parent.clone(),
                });
            }
        }
        for (user, record) in &self.users {
            for role in record.roles.iter().filter(|r| !known_roles.contains(*r)) {
                issues.push(ConfigValidationError::UnknownUserRole {
                    user: user.clone(),
                    role: role.clone(),
                });
            }
        }

        issues
    }

    pub fn to_permission_policy(&self) -> PermissionPolicy {
        build_permission_policy(&self.roles, &self.users)
    }

    pub fn to_sanitizer(&self) -> InputSanitizer {
        InputSanitizer::new(self.sanitizer.clone())
    }
}
