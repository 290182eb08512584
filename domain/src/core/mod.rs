//! Core domain concepts shared across all subdomains.
//!
//! - [`error::ToolError`]: recoverable per-call failure with an [`error::ErrorCode`]
//! - [`error::FieldError`]: a single schema violation located by field path

pub mod error;
