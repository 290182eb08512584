//! Engine and sanitizer configuration (`[engine]`, `[sanitizer]`, `[tools.<name>]`)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolgate_application::EngineConfig;
use toolgate_domain::CircuitBreakerConfig;

/// Raw execution engine configuration from TOML
///
/// # Example
///
/// ```toml
/// [engine]
/// default_timeout_secs = 30
/// failure_threshold = 5
/// failure_window_secs = 60
/// cooldown_secs = 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileEngineConfig {
    /// Per-call timeout for tools without their own
    pub default_timeout_secs: u64,
    /// Consecutive failures that open a tool's circuit
    pub failure_threshold: u32,
    /// Failures further apart than this restart the count
    pub failure_window_secs: u64,
    /// Time an open circuit waits before a trial call
    pub cooldown_secs: u64,
}

impl Default for FileEngineConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            default_timeout_secs: engine.default_timeout.as_secs(),
            failure_threshold: engine.circuit.failure_threshold,
            failure_window_secs: engine.circuit.failure_window.as_secs(),
            cooldown_secs: engine.circuit.cooldown.as_secs(),
        }
    }
}

impl FileEngineConfig {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig::default()
            .with_default_timeout(Duration::from_secs(self.default_timeout_secs))
            .with_circuit(
                CircuitBreakerConfig::default()
                    .with_failure_threshold(self.failure_threshold)
                    .with_failure_window(Duration::from_secs(self.failure_window_secs))
                    .with_cooldown(Duration::from_secs(self.cooldown_secs)),
            )
    }
}

/// Per-tool overrides applied on top of the registered spec
///
/// ```toml
/// [tools.current_time]
/// estimated_cost = 0.001
/// timeout_secs = 2
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolOverride {
    pub estimated_cost: Option<f64>,
    pub timeout_secs: Option<u64>,
}
