//! Failure isolation for tool handlers.

pub mod breaker;

pub use breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitPermit, CircuitState};
