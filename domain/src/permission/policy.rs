//! RBAC policy evaluation.
//!
//! [`PermissionPolicy`] is a plain value: evaluation is a pure function of
//! its roles, its user records and the call being checked. Mutating
//! operations work on `&mut self`; the application layer clones the current
//! snapshot, mutates the clone and swaps it in, so readers never observe a
//! half-applied change.

use super::entities::{Permission, RoleDefinition, UserPermissions};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

pub const ADMIN_ROLE: &str = "admin";
pub const DEVELOPER_ROLE: &str = "developer";
pub const AGENT_ROLE: &str = "agent";
pub const VIEWER_ROLE: &str = "viewer";

/// Source label for per-user custom permissions.
pub const CUSTOM_SOURCE: &str = "custom";

/// Outcome of a permission check, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PermissionDecision {
    /// Granted by `pattern`, declared in role `source` (or `custom`)
    Granted { source: String, pattern: String },
    /// The tool matches an entry on the user's deny-list
    DenyListed { pattern: String },
    /// The policy has no record of this user
    UnknownUser,
    /// No permission matched with satisfied conditions
    NoMatchingPermission,
}

impl PermissionDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionDecision::Granted { .. })
    }
}

#[derive(Debug, Clone, Default)]
pub struct PermissionPolicy {
    roles: HashMap<String, RoleDefinition>,
    users: HashMap<String, UserPermissions>,
}

impl PermissionPolicy {
    /// An empty policy: no roles, no users, nothing granted.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy with the four built-in roles registered.
    pub fn with_default_roles() -> Self {
        let mut policy = Self::new();
        for role in default_roles() {
            policy.define_role(role);
        }
        policy
    }

    pub fn define_role(&mut self, role: RoleDefinition) {
        self.roles.insert(role.name.clone(), role);
    }

    pub fn role(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(name)
    }

    pub fn role_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn set_user(&mut self, user: UserPermissions) {
        self.users.insert(user.user_id.clone(), user);
    }

    pub fn user(&self, user_id: &str) -> Option<&UserPermissions> {
        self.users.get(user_id)
    }

    /// Upsert a custom permission, replacing any rule for the same pattern,
    /// and lift a deny-list entry for that pattern.
    pub fn grant(&mut self, user_id: &str, permission: Permission) {
        let user = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserPermissions::new(user_id));
        user.custom.retain(|p| p.tool != permission.tool);
        user.denied.remove(&permission.tool);
        user.custom.push(permission);
    }

    /// Drop the custom grant for `tool` and deny-list it.
    pub fn revoke(&mut self, user_id: &str, tool: &str) {
        let user = self
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserPermissions::new(user_id));
        user.custom.retain(|p| p.tool != tool);
        user.denied.insert(tool.to_string());
    }

    pub fn can_execute(
        &self,
        user_id: &str,
        tool_name: &str,
        operation: &str,
        args: &Map<String, Value>,
    ) -> bool {
        self.explain(user_id, tool_name, operation, args).is_granted()
    }

    pub fn explain(
        &self,
        user_id: &str,
        tool_name: &str,
        operation: &str,
        args: &Map<String, Value>,
    ) -> PermissionDecision {
        let Some(user) = self.users.get(user_id) else {
            return PermissionDecision::UnknownUser;
        };

        if let Some(pattern) = user
            .denied
            .iter()
            .find(|p| super::pattern::wildcard_matches(p, tool_name))
        {
            return PermissionDecision::DenyListed {
                pattern: pattern.clone(),
            };
        }

        self.collect_permissions(user)
            .into_iter()
            .find(|(_, permission)| permission.grants(tool_name, operation, args))
            .map(|(source, permission)| PermissionDecision::Granted {
                source: source.to_string(),
                pattern: permission.tool.clone(),
            })
            .unwrap_or(PermissionDecision::NoMatchingPermission)
    }

    /// Role permissions (inheritance followed depth-first, each role at most
    /// once) followed by the user's custom permissions.
    fn collect_permissions<'a>(&'a self, user: &'a UserPermissions) -> Vec<(&'a str, &'a Permission)> {
        let mut visited = HashSet::new();
        let mut collected = Vec::new();
        for role in &user.roles {
            self.collect_role(role, &mut visited, &mut collected);
        }
        collected.extend(user.custom.iter().map(|p| (CUSTOM_SOURCE, p)));
        collected
    }

    fn collect_role<'a>(
        &'a self,
        name: &'a str,
        visited: &mut HashSet<&'a str>,
        collected: &mut Vec<(&'a str, &'a Permission)>,
    ) {
        if !visited.insert(name) {
            return;
        }
        let Some(role) = self.roles.get(name) else {
            return;
        };
        collected.extend(role.permissions.iter().map(|p| (role.name.as_str(), p)));
        for parent in &role.inherits {
            self.collect_role(parent, visited, collected);
        }
    }
}

/// The built-in roles.
pub fn default_roles() -> Vec<RoleDefinition> {
    vec![
        RoleDefinition::new(ADMIN_ROLE)
            .with_description("Unrestricted access to every tool")
            .with_permission(Permission::new("*", ["*"])),
        RoleDefinition::new(DEVELOPER_ROLE)
            .with_description("Read, write and execute on every tool")
            .with_permission(Permission::new("*", ["read", "write", "execute"])),
        RoleDefinition::new(AGENT_ROLE)
            .with_description("Enumerated operations for autonomous agents")
            .with_permission(Permission::new("*", ["read", "execute", "create", "comment"])),
        RoleDefinition::new(VIEWER_ROLE)
            .with_description("Read-only access")
            .with_permission(Permission::new("*", ["read"])),
    ]
}
