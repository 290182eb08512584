//! Execution engine settings.

use std::time::Duration;
use toolgate_domain::CircuitBreakerConfig;

/// Settings shared by every tool the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Per-call timeout for tools that do not set their own.
    pub default_timeout: Duration,
    pub circuit: CircuitBreakerConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            circuit: CircuitBreakerConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_circuit(mut self, circuit: CircuitBreakerConfig) -> Self {
        self.circuit = circuit;
        self
    }
}
