//! Application configuration types.

pub mod engine_config;
pub mod execution_params;

pub use engine_config::EngineConfig;
pub use execution_params::{Concurrency, ExecutionParams};
