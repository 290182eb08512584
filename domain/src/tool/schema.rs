//! Parameter schemas and argument validation.
//!
//! [`ParameterSchema`] is a JSON-Schema-shaped description of a tool's
//! arguments. It serializes with the familiar JSON Schema keywords
//! (`type`, `enum`, `minLength`, `additionalProperties`, ...) so specs can be
//! written by hand in JSON or TOML and passed verbatim to model adapters.
//!
//! Validation never stops at the first problem: every violation is collected
//! as a [`FieldError`] with a path such as `$.labels[2]`, so the model gets a
//! complete list of what to fix in a single round trip.

use crate::core::error::FieldError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex"));
static URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z][a-zA-Z0-9+.\-]*://\S+$").expect("valid uri regex")
});
static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid uuid regex")
});

/// JSON type accepted by a schema node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    /// No type constraint.
    #[default]
    Any,
}

impl SchemaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaType::String => "string",
            SchemaType::Number => "number",
            SchemaType::Integer => "integer",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
            SchemaType::Any => "any",
        }
    }
}

/// Well-known string formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Email,
    Uri,
    DateTime,
    Uuid,
    Ipv4,
}

impl StringFormat {
    fn accepts(&self, s: &str) -> bool {
        match self {
            StringFormat::Email => EMAIL_RE.is_match(s),
            StringFormat::Uri => URI_RE.is_match(s),
            StringFormat::DateTime => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
            StringFormat::Uuid => UUID_RE.is_match(s),
            StringFormat::Ipv4 => s.parse::<std::net::Ipv4Addr>().is_ok(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            StringFormat::Email => "email",
            StringFormat::Uri => "uri",
            StringFormat::DateTime => "date-time",
            StringFormat::Uuid => "uuid",
            StringFormat::Ipv4 => "ipv4",
        }
    }
}

/// Schema for a tool parameter (or for the whole argument object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterSchema>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, ParameterSchema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// `Some(false)` rejects keys not listed in `properties`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<bool>,
}

impl ParameterSchema {
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type,
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::of_type(SchemaType::Object)
    }

    pub fn string() -> Self {
        Self::of_type(SchemaType::String)
    }

    pub fn number() -> Self {
        Self::of_type(SchemaType::Number)
    }

    pub fn integer() -> Self {
        Self::of_type(SchemaType::Integer)
    }

    pub fn boolean() -> Self {
        Self::of_type(SchemaType::Boolean)
    }

    pub fn array(items: ParameterSchema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of_type(SchemaType::Array)
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        schema: ParameterSchema,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required && !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, schema);
        self
    }

    pub fn with_format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_enum(mut self, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_item_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }

    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = Some(false);
        self
    }

    /// Validate a value, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<FieldError>> {
        let mut errors = Vec::new();
        self.check(value, "$", &mut errors);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn check(&self, value: &Value, path: &str, errors: &mut Vec<FieldError>) {
        let type_ok = match self.schema_type {
            SchemaType::Any => true,
            SchemaType::String => value.is_string(),
            SchemaType::Number => value.is_number(),
            SchemaType::Integer => is_integer(value),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Array => value.is_array(),
            SchemaType::Object => value.is_object(),
        };
        if !type_ok {
            errors.push(FieldError::new(
                path,
                format!(
                    "expected {}, got {}",
                    self.schema_type.as_str(),
                    json_type_name(value)
                ),
            ));
            return;
        }

        if let Some(allowed) = &self.enum_values
            && !allowed.contains(value)
        {
            let rendered = allowed
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            errors.push(FieldError::new(
                path,
                format!("must be one of [{}]", rendered),
            ));
        }

        match value {
            Value::String(s) => self.check_string(s, path, errors),
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    self.check_number(n, path, errors);
                }
            }
            Value::Array(items) => self.check_array(items, path, errors),
            Value::Object(map) => self.check_object(map, path, errors),
            _ => {}
        }
    }

    fn check_string(&self, s: &str, path: &str, errors: &mut Vec<FieldError>) {
        let len = s.chars().count();
        if let Some(min) = self.min_length
            && len < min
        {
            errors.push(FieldError::new(
                path,
                format!("must be at least {} characters", min),
            ));
        }
        if let Some(max) = self.max_length
            && len > max
        {
            errors.push(FieldError::new(
                path,
                format!("must be at most {} characters", max),
            ));
        }
        if let Some(format) = self.format
            && !format.accepts(s)
        {
            errors.push(FieldError::new(
                path,
                format!("must be a valid {}", format.as_str()),
            ));
        }
        if let Some(pattern) = &self.pattern {
            match Regex::new(pattern) {
                Ok(re) if re.is_match(s) => {}
                Ok(_) => errors.push(FieldError::new(
                    path,
                    format!("must match pattern '{}'", pattern),
                )),
                Err(_) => errors.push(FieldError::new(
                    path,
                    format!("schema pattern '{}' is not a valid regular expression", pattern),
                )),
            }
        }
    }

    fn check_number(&self, n: f64, path: &str, errors: &mut Vec<FieldError>) {
        if let Some(min) = self.minimum
            && n < min
        {
            errors.push(FieldError::new(path, format!("must be >= {}", min)));
        }
        if let Some(max) = self.maximum
            && n > max
        {
            errors.push(FieldError::new(path, format!("must be <= {}", max)));
        }
    }

    fn check_array(&self, items: &[Value], path: &str, errors: &mut Vec<FieldError>) {
        if let Some(min) = self.min_items
            && items.len() < min
        {
            errors.push(FieldError::new(
                path,
                format!("must contain at least {} items", min),
            ));
        }
        if let Some(max) = self.max_items
            && items.len() > max
        {
            errors.push(FieldError::new(
                path,
                format!("must contain at most {} items", max),
            ));
        }
        if let Some(item_schema) = &self.items {
            for (index, item) in items.iter().enumerate() {
                item_schema.check(item, &format!("{}[{}]", path, index), errors);
            }
        }
    }

    fn check_object(
        &self,
        map: &serde_json::Map<String, Value>,
        path: &str,
        errors: &mut Vec<FieldError>,
    ) {
        for name in &self.required {
            if !map.contains_key(name) {
                errors.push(FieldError::new(format!("{}.{}", path, name), "is required"));
            }
        }
        for (name, value) in map {
            let field_path = format!("{}.{}", path, name);
            match self.properties.get(name) {
                Some(schema) => schema.check(value, &field_path, errors),
                None if self.additional_properties == Some(false) => {
                    errors.push(FieldError::new(field_path, "is not an allowed property"));
                }
                None => {}
            }
        }
    }
}

fn is_integer(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn issue_schema() -> ParameterSchema {
        ParameterSchema::object()
            .with_property(
                "title",
                ParameterSchema::string().with_length(Some(1), Some(20)),
                true,
            )
            .with_property(
                "priority",
                ParameterSchema::string().with_enum(["low", "high"]),
                false,
            )
            .with_property(
                "estimate",
                ParameterSchema::integer().with_range(Some(1.0), Some(13.0)),
                false,
            )
            .with_property(
                "labels",
                ParameterSchema::array(ParameterSchema::string()).with_item_bounds(None, Some(3)),
                false,
            )
            .with_property(
                "assignee",
                ParameterSchema::object()
                    .with_property(
                        "email",
                        ParameterSchema::string().with_format(StringFormat::Email),
                        true,
                    )
                    .deny_additional(),
                false,
            )
    }

    #[test]
    fn test_valid_arguments_pass() {
        let args = json!({
            "title": "Fix login",
            "priority": "high",
            "estimate": 3,
            "labels": ["bug", "auth"],
            "assignee": {"email": "dev@example.com"},
        });
        assert!(issue_schema().validate(&args).is_ok());
    }

    #[test]
    fn test_missing_required_field() {
        let errors = issue_schema().validate(&json!({})).unwrap_err();
        assert_eq!(errors, vec![FieldError::new("$.title", "is required")]);
    }

    #[test]
    fn test_errors_are_itemized_by_path() {
        let args = json!({
            "title": "",
            "priority": "urgent",
            "estimate": 40,
            "labels": ["ok", 7],
            "assignee": {"email": "not-an-email", "role": "owner"},
        });
        let errors = issue_schema().validate(&args).unwrap_err();
        let paths: Vec<&str> = errors.iter().map(|e| e.path.as_str()).collect();

        assert!(paths.contains(&"$.title"));
        assert!(paths.contains(&"$.priority"));
        assert!(paths.contains(&"$.estimate"));
        assert!(paths.contains(&"$.labels[1]"));
        assert!(paths.contains(&"$.assignee.email"));
        assert!(paths.contains(&"$.assignee.role"));
        assert_eq!(errors.len(), 6);
    }

    #[test]
    fn test_type_mismatch_reports_actual_type() {
        let errors = ParameterSchema::integer().validate(&json!(2.5)).unwrap_err();
        assert_eq!(errors[0].message, "expected integer, got number");

        let errors = ParameterSchema::object().validate(&json!(null)).unwrap_err();
        assert_eq!(errors[0].path, "$");
        assert_eq!(errors[0].message, "expected object, got null");
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(ParameterSchema::integer().validate(&json!(4.0)).is_ok());
    }

    #[test]
    fn test_array_bounds() {
        let schema = issue_schema();
        let errors = schema
            .validate(&json!({"title": "t", "labels": ["a", "b", "c", "d"]}))
            .unwrap_err();
        assert_eq!(errors[0].path, "$.labels");
        assert!(errors[0].message.contains("at most 3"));
    }

    #[test]
    fn test_formats() {
        let uri = ParameterSchema::string().with_format(StringFormat::Uri);
        assert!(uri.validate(&json!("https://example.com/x")).is_ok());
        assert!(uri.validate(&json!("example.com")).is_err());

        let when = ParameterSchema::string().with_format(StringFormat::DateTime);
        assert!(when.validate(&json!("2026-03-01T12:00:00Z")).is_ok());
        assert!(when.validate(&json!("yesterday")).is_err());

        let id = ParameterSchema::string().with_format(StringFormat::Uuid);
        assert!(id.validate(&json!("123e4567-e89b-12d3-a456-426614174000")).is_ok());
        assert!(id.validate(&json!("123")).is_err());

        let ip = ParameterSchema::string().with_format(StringFormat::Ipv4);
        assert!(ip.validate(&json!("10.0.0.1")).is_ok());
        assert!(ip.validate(&json!("10.0.0.300")).is_err());
    }

    #[test]
    fn test_pattern() {
        let schema = ParameterSchema::string().with_pattern("^[a-z-]+$");
        assert!(schema.validate(&json!("feature-branch")).is_ok());
        assert!(schema.validate(&json!("Main")).is_err());

        let broken = ParameterSchema::string().with_pattern("(");
        let errors = broken.validate(&json!("x")).unwrap_err();
        assert!(errors[0].message.contains("not a valid regular expression"));
    }

    #[test]
    fn test_json_schema_round_trip_keywords() {
        let schema = issue_schema();
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["title"]));
        assert_eq!(value["properties"]["title"]["minLength"], 1);
        assert_eq!(value["properties"]["priority"]["enum"], json!(["low", "high"]));
        assert_eq!(
            value["properties"]["assignee"]["additionalProperties"],
            json!(false)
        );

        let parsed: ParameterSchema = serde_json::from_value(value).unwrap();
        assert_eq!(parsed, schema);
    }
}
