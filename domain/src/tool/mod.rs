//! Tool domain module
//!
//! Pure definitions for the **tool side** of the gateway: what a tool looks
//! like, how a call is parsed, how its arguments are checked and cleaned, and
//! what a result looks like.
//!
//! ```text
//! ┌──────────────────┐   parse   ┌──────────┐  validate   ┌──────────┐
//! │ RequestedToolCall│──────────▶│ ToolCall │──sanitize──▶│ handler  │──▶ ToolResult
//! │ (raw payload)    │           │          │  (schema)   │          │
//! └──────────────────┘           └──────────┘             └──────────┘
//! ```
//!
//! # Key Types
//!
//! - [`ToolSpec`]: name, description, [`ParameterSchema`], estimated cost
//! - [`RequestedToolCall`] / [`ToolCall`]: raw and parsed invocations
//! - [`ParameterSchema`]: JSON-Schema-shaped argument contract + validator
//! - [`InputSanitizer`]: control-character and reserved-key scrubbing
//! - [`ToolResult`]: normalized outcome of every call
//!
//! Handlers and the registry are async and therefore live in the application
//! layer (`ports::tool_registry`).

pub mod entities;
pub mod sanitizer;
pub mod schema;
pub mod value_objects;

pub use entities::{RequestedToolCall, ToolCall, ToolSpec};
pub use sanitizer::{InputSanitizer, SanitizerConfig};
pub use schema::{ParameterSchema, SchemaType, StringFormat};
pub use value_objects::ToolResult;
