//! Permission checker service
//!
//! Holds the current [`PermissionPolicy`] snapshot. Checks read an `Arc` of
//! the snapshot; administrative changes build a new snapshot and swap it in
//! whole, so a check never sees a partially applied grant or revoke.

use serde_json::{Map, Value};
use std::sync::{Arc, RwLock};
use toolgate_domain::{
    Permission, PermissionDecision, PermissionPolicy, RoleDefinition, UserPermissions,
};
use tracing::debug;

pub struct PermissionChecker {
    policy: RwLock<Arc<PermissionPolicy>>,
}

impl Default for PermissionChecker {
    fn default() -> Self {
        Self::new(PermissionPolicy::with_default_roles())
    }
}

impl PermissionChecker {
    pub fn new(policy: PermissionPolicy) -> Self {
        Self {
            policy: RwLock::new(Arc::new(policy)),
        }
    }

    /// The current policy snapshot.
    pub fn snapshot(&self) -> Arc<PermissionPolicy> {
        self.policy
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn can_execute(
        &self,
        user_id: &str,
        tool_name: &str,
        operation: &str,
        args: &Map<String, Value>,
    ) -> bool {
        self.explain(user_id, tool_name, operation, args)
            .is_granted()
    }

    pub fn explain(
        &self,
        user_id: &str,
        tool_name: &str,
        operation: &str,
        args: &Map<String, Value>,
    ) -> PermissionDecision {
        let decision = self
            .snapshot()
            .explain(user_id, tool_name, operation, args);
        debug!(
            "Permission {} for {} on {}: {:?}",
            operation, user_id, tool_name, decision
        );
        decision
    }

    pub fn grant_permission(&self, user_id: &str, permission: Permission) {
        self.update(|policy| policy.grant(user_id, permission));
    }

    pub fn revoke_permission(&self, user_id: &str, tool_name: &str) {
        self.update(|policy| policy.revoke(user_id, tool_name));
    }

    pub fn set_user_permissions(&self, user: UserPermissions) {
        self.update(|policy| policy.set_user(user));
    }

    pub fn define_role(&self, role: RoleDefinition) {
        self.update(|policy| policy.define_role(role));
    }

    fn update(&self, change: impl FnOnce(&mut PermissionPolicy)) {
        let mut guard = self.policy.write().unwrap_or_else(|e| e.into_inner());
        let mut next = (**guard).clone();
        change(&mut next);
        *guard = Arc::new(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolgate_domain::permission::{AGENT_ROLE, VIEWER_ROLE};

    #[test]
    fn test_grant_and_revoke_swap_snapshots() {
        let checker = PermissionChecker::default();
        checker.set_user_permissions(UserPermissions::new("u").with_role(VIEWER_ROLE));
        let before = checker.snapshot();

        checker.grant_permission("u", Permission::new("deploy", ["execute"]));
        assert!(checker.can_execute("u", "deploy", "execute", &Map::new()));

        // The old snapshot is untouched
        assert!(!before.can_execute("u", "deploy", "execute", &Map::new()));

        checker.revoke_permission("u", "deploy");
        assert!(!checker.can_execute("u", "deploy", "execute", &Map::new()));
        // Revoking deny-lists the tool, overriding the viewer role
        assert!(!checker.can_execute("u", "deploy", "read", &Map::new()));
    }

    #[test]
    fn test_define_role_applies_to_existing_users() {
        let checker = PermissionChecker::default();
        checker.set_user_permissions(UserPermissions::new("bot").with_role(AGENT_ROLE));
        assert!(checker.can_execute("bot", "github/deleteBranches", "execute", &Map::new()));

        checker.define_role(
            RoleDefinition::new(AGENT_ROLE)
                .with_permission(Permission::new("github/createIssues", ["execute"])),
        );
        assert!(checker.can_execute("bot", "github/createIssues", "execute", &Map::new()));
        assert!(!checker.can_execute("bot", "github/deleteBranches", "execute", &Map::new()));
    }
}
