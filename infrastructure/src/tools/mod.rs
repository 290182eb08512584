//! Tool adapters
//!
//! The static registry, closure-backed handlers and the built-in tools.

pub mod builtin;
mod handler;
mod registry;

pub use builtin::builtin_tools;
pub use handler::FnToolHandler;
pub use registry::StaticToolRegistry;
