//! Execution parameters for the pipeline loop.
//!
//! [`ExecutionParams`] groups the static parameters that control the
//! conversation loop in [`RunPipelineUseCase`](crate::use_cases::run_pipeline::RunPipelineUseCase).
//! These are application-layer concerns, not domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the calls of one turn are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Concurrency {
    /// One call at a time, in request order.
    Sequential,
    /// Up to `n` calls in flight at once.
    Parallel(usize),
}

impl Concurrency {
    /// Number of calls allowed in flight.
    pub fn limit(&self) -> usize {
        match self {
            Concurrency::Sequential => 1,
            Concurrency::Parallel(n) => (*n).max(1),
        }
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Concurrency::Parallel(4)
    }
}

/// Conversation loop control parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionParams {
    /// Maximum model round trips per run.
    pub max_turns: u32,
    /// Deadline for one turn (model call plus tool dispatch).
    pub per_turn_timeout: Option<Duration>,
    /// Fan-out of tool calls within a turn.
    pub concurrency: Concurrency,
    /// Use the adapter's streaming interface.
    pub streaming: bool,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        Self {
            max_turns: 10,
            per_turn_timeout: Some(Duration::from_secs(120)),
            concurrency: Concurrency::default(),
            streaming: false,
        }
    }
}

impl ExecutionParams {
    // ==================== Builder Methods ====================

    pub fn with_max_turns(mut self, max: u32) -> Self {
        self.max_turns = max;
        self
    }

    pub fn with_per_turn_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.per_turn_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: Concurrency) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = ExecutionParams::default();
        assert_eq!(params.max_turns, 10);
        assert_eq!(params.per_turn_timeout, Some(Duration::from_secs(120)));
        assert_eq!(params.concurrency, Concurrency::Parallel(4));
        assert!(!params.streaming);
    }

    #[test]
    fn test_builder() {
        let params = ExecutionParams::default()
            .with_max_turns(3)
            .with_per_turn_timeout(None)
            .with_concurrency(Concurrency::Sequential);

        assert_eq!(params.max_turns, 3);
        assert!(params.per_turn_timeout.is_none());
        assert_eq!(params.concurrency.limit(), 1);
    }

    #[test]
    fn test_parallel_zero_still_makes_progress() {
        assert_eq!(Concurrency::Parallel(0).limit(), 1);
        assert_eq!(Concurrency::Parallel(8).limit(), 8);
    }
}
