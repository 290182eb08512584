//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod clock;
pub mod conversation_logger;
pub mod model_adapter;
pub mod progress;
pub mod state_store;
pub mod tool_registry;
