//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording conversation events
//! (model responses, tool calls, admission denials, tool results) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! conversation transcript in a machine-readable format (JSONL).

use serde_json::Value;

/// A structured conversation event for logging.
///
/// Each event has a type string, a UTC timestamp, and a JSON payload
/// containing event-specific fields.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "model_response", "tool_call", "tool_result").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    /// Create a new conversation event. The logger stamps it when written.
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }
}

/// Port for logging conversation events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// The `log` method is intentionally synchronous and non-fallible to avoid
/// disrupting the main execution flow. Logging failures are silently ignored.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}

/// In-memory logger that keeps every event (tests, diagnostics).
#[derive(Default)]
pub struct MemoryConversationLogger {
    events: std::sync::Mutex<Vec<(&'static str, Value)>>,
}

impl MemoryConversationLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Event types in the order they were logged.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.lock().iter().map(|(t, _)| *t).collect()
    }

    /// Payloads of all events of `event_type`.
    pub fn payloads(&self, event_type: &str) -> Vec<Value> {
        self.lock()
            .iter()
            .filter(|(t, _)| *t == event_type)
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(&'static str, Value)>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ConversationLogger for MemoryConversationLogger {
    fn log(&self, event: ConversationEvent) {
        self.lock().push((event.event_type, event.payload));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_logger_records_in_order() {
        let logger = MemoryConversationLogger::new();
        logger.log(ConversationEvent::new("tool_call", json!({"tool": "echo"})));
        logger.log(ConversationEvent::new("tool_result", json!({"success": true})));

        assert_eq!(logger.event_types(), vec!["tool_call", "tool_result"]);
        assert_eq!(logger.payloads("tool_call")[0]["tool"], "echo");
    }
}
