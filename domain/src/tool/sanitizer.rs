//! Input sanitization for tool arguments.
//!
//! Runs after schema validation and before the permission check. Strings lose
//! control characters (NUL included) except ordinary whitespace, object keys
//! carrying a reserved prefix are dropped, and arrays/objects are cleaned
//! recursively. Sanitization never rejects a call itself; the admission
//! controller validates the cleaned arguments a second time.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key prefixes dropped by default (`__proto__`, `$where`, ...).
pub const DEFAULT_RESERVED_PREFIXES: &[&str] = &["__", "$"];

/// Sanitizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    pub reserved_prefixes: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            reserved_prefixes: DEFAULT_RESERVED_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InputSanitizer {
    config: SanitizerConfig,
}

impl InputSanitizer {
    pub fn new(config: SanitizerConfig) -> Self {
        Self { config }
    }

    /// Clean every key and value. A key that only matches another key once
    /// its control characters are stripped is dropped, never merged: the
    /// clean key keeps its own value.
    pub fn sanitize_arguments(&self, arguments: &Map<String, Value>) -> Map<String, Value> {
        let mut cleaned = Map::new();
        let mut rewritten = Vec::new();
        for (key, value) in arguments {
            let clean_key = sanitize_str(key);
            if self.is_reserved(&clean_key) {
                continue;
            }
            if clean_key == *key {
                cleaned.insert(clean_key, self.sanitize(value));
            } else {
                rewritten.push((clean_key, value));
            }
        }
        for (clean_key, value) in rewritten {
            if !cleaned.contains_key(&clean_key) {
                cleaned.insert(clean_key, self.sanitize(value));
            }
        }
        cleaned
    }

    pub fn sanitize(&self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(sanitize_str(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.sanitize(v)).collect()),
            Value::Object(map) => Value::Object(self.sanitize_arguments(map)),
            other => other.clone(),
        }
    }

    fn is_reserved(&self, key: &str) -> bool {
        self.config
            .reserved_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && key.starts_with(prefix.as_str()))
    }
}

/// Remove control characters other than `\n`, `\r` and `\t`.
pub fn sanitize_str(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_null_and_control_characters() {
        assert_eq!(sanitize_str("ab\0c\u{7}d\u{1b}[0m"), "abcd[0m");
        assert_eq!(sanitize_str("line1\nline2\tx\r\n"), "line1\nline2\tx\r\n");
    }

    #[test]
    fn test_drops_reserved_keys_recursively() {
        let sanitizer = InputSanitizer::default();
        let value = json!({
            "title": "ok\0",
            "__proto__": {"admin": true},
            "$where": "1 == 1",
            "nested": {"$gt": 1, "keep": "yes"},
            "items": [{"__x": 1, "y": "a\u{0}b"}, "c\u{8}"],
        });

        let cleaned = sanitizer.sanitize(&value);
        assert_eq!(
            cleaned,
            json!({
                "title": "ok",
                "nested": {"keep": "yes"},
                "items": [{"y": "ab"}, "c"],
            })
        );
    }

    #[test]
    fn test_custom_prefixes() {
        let sanitizer = InputSanitizer::new(SanitizerConfig {
            reserved_prefixes: vec!["internal_".to_string(), String::new()],
        });
        let args = json!({"internal_token": "x", "$ok": 1, "name": "n"});
        let cleaned = sanitizer.sanitize_arguments(args.as_object().unwrap());

        assert!(!cleaned.contains_key("internal_token"));
        assert!(cleaned.contains_key("$ok"));
        assert!(cleaned.contains_key("name"));
    }

    #[test]
    fn test_rewritten_key_never_overwrites_clean_key() {
        let sanitizer = InputSanitizer::default();
        let args = json!({"count": 5, "count\u{0}": "DROP TABLE users"});
        let cleaned = sanitizer.sanitize_arguments(args.as_object().unwrap());
        assert_eq!(Value::Object(cleaned), json!({"count": 5}));

        // Two dirty spellings of one key: the first in map order wins
        let args = json!({"a\u{1}b": 1, "ab\u{2}": 2});
        let cleaned = sanitizer.sanitize_arguments(args.as_object().unwrap());
        assert_eq!(cleaned.len(), 1);
        assert!(cleaned.contains_key("ab"));
    }

    #[test]
    fn test_non_string_scalars_untouched() {
        let sanitizer = InputSanitizer::default();
        let value = json!([1, 2.5, true, null]);
        assert_eq!(sanitizer.sanitize(&value), value);
    }
}
