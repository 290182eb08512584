//! Permission entities: permissions, conditions, roles and per-user records.

use super::pattern::wildcard_matches;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Operator of a [`PermissionCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Field value equals the condition value exactly
    Equals,
    /// String field contains the condition value as a substring
    Contains,
    /// String field matches the condition value as a regular expression
    Matches,
    /// Field value is one of the listed values
    In,
    /// Field value is none of the listed values
    NotIn,
}

/// A constraint on call arguments attached to a permission.
///
/// `field` is a dotted path into the argument object (`repo.owner`). A
/// missing field never satisfies a condition, whatever the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCondition {
    pub field: String,
    pub operator: ConditionOperator,
    pub value: Value,
}

impl PermissionCondition {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    pub fn evaluate(&self, args: &Map<String, Value>) -> bool {
        let Some(actual) = lookup(args, &self.field) else {
            return false;
        };

        match self.operator {
            ConditionOperator::Equals => actual == &self.value,
            ConditionOperator::Contains => match (actual.as_str(), self.value.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            ConditionOperator::Matches => match (actual.as_str(), self.value.as_str()) {
                (Some(text), Some(pattern)) => Regex::new(pattern)
                    .map(|re| re.is_match(text))
                    .unwrap_or(false),
                _ => false,
            },
            ConditionOperator::In => self
                .value
                .as_array()
                .is_some_and(|set| set.contains(actual)),
            ConditionOperator::NotIn => self
                .value
                .as_array()
                .is_some_and(|set| !set.contains(actual)),
        }
    }
}

fn lookup<'a>(args: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = args.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// A grant on tools matching `tool` for the listed operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    /// Tool-name pattern, `*` as wildcard
    pub tool: String,
    /// Allowed operations; `*` allows every operation
    pub operations: Vec<String>,
    /// All conditions must hold for the permission to apply
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<PermissionCondition>,
}

impl Permission {
    pub fn new<I, S>(tool: impl Into<String>, operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tool: tool.into(),
            operations: operations.into_iter().map(Into::into).collect(),
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: PermissionCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn matches_tool(&self, tool_name: &str) -> bool {
        wildcard_matches(&self.tool, tool_name)
    }

    pub fn allows_operation(&self, operation: &str) -> bool {
        self.operations.iter().any(|op| op == "*" || op == operation)
    }

    pub fn conditions_hold(&self, args: &Map<String, Value>) -> bool {
        self.conditions.iter().all(|c| c.evaluate(args))
    }

    /// Whether this permission grants `operation` on `tool_name` for `args`.
    pub fn grants(&self, tool_name: &str, operation: &str, args: &Map<String, Value>) -> bool {
        self.matches_tool(tool_name) && self.allows_operation(operation) && self.conditions_hold(args)
    }
}

/// A named bundle of permissions, optionally inheriting other roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub permissions: Vec<Permission>,
    #[serde(default)]
    pub inherits: Vec<String>,
}

impl RoleDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            permissions: Vec::new(),
            inherits: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.push(permission);
        self
    }

    pub fn inheriting(mut self, role: impl Into<String>) -> Self {
        self.inherits.push(role.into());
        self
    }
}

/// Everything the policy knows about one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPermissions {
    pub user_id: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub custom: Vec<Permission>,
    /// Tool-name patterns this user may never execute
    #[serde(default)]
    pub denied: BTreeSet<String>,
}

impl UserPermissions {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    pub fn with_custom(mut self, permission: Permission) -> Self {
        self.custom.push(permission);
        self
    }

    pub fn with_denied(mut self, tool: impl Into<String>) -> Self {
        self.denied.insert(tool.into());
        self
    }

    pub fn is_denied(&self, tool_name: &str) -> bool {
        self.denied.iter().any(|p| wildcard_matches(p, tool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_condition_operators() {
        let a = args(json!({"repo": "acme/api", "count": 3, "meta": {"env": "prod"}}));

        let eq = PermissionCondition::new("count", ConditionOperator::Equals, json!(3));
        assert!(eq.evaluate(&a));

        let contains = PermissionCondition::new("repo", ConditionOperator::Contains, json!("acme/"));
        assert!(contains.evaluate(&a));

        let matches = PermissionCondition::new("repo", ConditionOperator::Matches, json!("^acme/"));
        assert!(matches.evaluate(&a));

        let in_set = PermissionCondition::new("meta.env", ConditionOperator::In, json!(["dev", "prod"]));
        assert!(in_set.evaluate(&a));

        let not_in = PermissionCondition::new("meta.env", ConditionOperator::NotIn, json!(["prod"]));
        assert!(!not_in.evaluate(&a));
    }

    #[test]
    fn test_missing_field_fails_every_operator() {
        let a = args(json!({}));
        for op in [
            ConditionOperator::Equals,
            ConditionOperator::Contains,
            ConditionOperator::Matches,
            ConditionOperator::In,
            ConditionOperator::NotIn,
        ] {
            let c = PermissionCondition::new("repo", op, json!(["x"]));
            assert!(!c.evaluate(&a), "{:?} should fail on a missing field", op);
        }
    }

    #[test]
    fn test_invalid_regex_fails_condition() {
        let c = PermissionCondition::new("repo", ConditionOperator::Matches, json!("(unclosed"));
        assert!(!c.evaluate(&args(json!({"repo": "x"}))));
    }

    #[test]
    fn test_permission_grants() {
        let p = Permission::new("github/*", ["read", "execute"]).with_condition(
            PermissionCondition::new("repo", ConditionOperator::Contains, json!("acme")),
        );

        assert!(p.grants("github/createIssues", "execute", &args(json!({"repo": "acme/api"}))));
        assert!(!p.grants("github/createIssues", "write", &args(json!({"repo": "acme/api"}))));
        assert!(!p.grants("github/createIssues", "execute", &args(json!({"repo": "other"}))));
        assert!(!p.grants("gitlab/createIssues", "execute", &args(json!({"repo": "acme"}))));
    }

    #[test]
    fn test_deny_list_uses_patterns() {
        let user = UserPermissions::new("u").with_denied("github/delete*");
        assert!(user.is_denied("github/deleteBranches"));
        assert!(!user.is_denied("github/createIssues"));
    }

    #[test]
    fn test_permission_deserializes_from_toml_shape() {
        let p: Permission = serde_json::from_value(json!({
            "tool": "db/*",
            "operations": ["read"],
            "conditions": [{"field": "table", "operator": "not_in", "value": ["secrets"]}]
        }))
        .unwrap();
        assert_eq!(p.conditions[0].operator, ConditionOperator::NotIn);
    }
}
