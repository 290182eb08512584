//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod admit_call;
pub mod execute_tool;
pub mod run_pipeline;
