//! Pipeline configuration from TOML (`[pipeline]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use toolgate_application::{Concurrency, ExecutionParams};

/// Raw pipeline configuration from TOML
///
/// # Example
///
/// ```toml
/// [pipeline]
/// max_turns = 10
/// per_turn_timeout_secs = 120     # omit for no turn deadline
/// max_parallel_calls = 4          # 1 dispatches calls one at a time
/// streaming = false
/// system_prompt = "You are a careful assistant."
/// conversation_log = "~/.local/share/toolgate/last.jsonl"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Maximum model turns per run
    pub max_turns: u32,
    /// Deadline for one turn (model call plus tool dispatch)
    pub per_turn_timeout_secs: Option<u64>,
    /// Calls dispatched concurrently within a turn
    pub max_parallel_calls: usize,
    /// Request streamed model responses
    pub streaming: bool,
    /// System prompt handed to the model adapter
    pub system_prompt: Option<String>,
    /// JSONL transcript destination
    pub conversation_log: Option<PathBuf>,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let params = ExecutionParams::default();
        Self {
            max_turns: params.max_turns,
            per_turn_timeout_secs: params.per_turn_timeout.map(|t| t.as_secs()),
            max_parallel_calls: params.concurrency.limit(),
            streaming: params.streaming,
            system_prompt: None,
            conversation_log: None,
        }
    }
}

impl FilePipelineConfig {
    pub fn to_execution_params(&self) -> ExecutionParams {
        let concurrency = if self.max_parallel_calls <= 1 {
            Concurrency::Sequential
        } else {
            Concurrency::Parallel(self.max_parallel_calls)
        };
        ExecutionParams::default()
            .with_max_turns(self.max_turns)
            .with_per_turn_timeout(self.per_turn_timeout_secs.map(Duration::from_secs))
            .with_concurrency(concurrency)
            .with_streaming(self.streaming)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_execution_params() {
        let params = FilePipelineConfig::default().to_execution_params();
        let defaults = ExecutionParams::default();
        assert_eq!(params.max_turns, defaults.max_turns);
        assert_eq!(params.per_turn_timeout, defaults.per_turn_timeout);
        assert_eq!(params.concurrency, defaults.concurrency);
    }

    #[test]
    fn test_single_call_means_sequential() {
        let config = FilePipelineConfig {
            max_parallel_calls: 1,
            per_turn_timeout_secs: None,
            ..Default::default()
        };
        let params = config.to_execution_params();
        assert_eq!(params.concurrency, Concurrency::Sequential);
        assert!(params.per_turn_timeout.is_none());
    }
}
