//! Access control configuration (`[roles.<name>]`, `[users.<id>]`)

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use toolgate_domain::{Permission, PermissionPolicy, RoleDefinition, UserPermissions};

/// Raw role definition from TOML
///
/// # Example
///
/// ```toml
/// [roles.triager]
/// description = "Reads everything, labels issues"
/// inherits = ["viewer"]
///
/// [[roles.triager.permissions]]
/// tool = "issues/*"
/// operations = ["execute"]
/// conditions = [{ field = "repo", operator = "equals", value = "toolgate" }]
/// ```
///
/// A role named like a built-in one (`admin`, `developer`, `agent`,
/// `viewer`) replaces it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoleConfig {
    pub description: String,
    pub permissions: Vec<Permission>,
    pub inherits: Vec<String>,
}

/// Raw user record from TOML
///
/// ```toml
/// [users.alice]
/// roles = ["developer"]
/// denied = ["admin/*"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileUserConfig {
    pub roles: Vec<String>,
    pub custom: Vec<Permission>,
    pub denied: BTreeSet<String>,
}

/// Build the permission policy: built-in roles, then configured roles,
/// then configured users.
pub fn build_permission_policy(
    roles: &BTreeMap<String, FileRoleConfig>,
    users: &BTreeMap<String, FileUserConfig>,
) -> PermissionPolicy {
    let mut policy = PermissionPolicy::with_default_roles();

    for (name, role) in roles {
        policy.define_role(RoleDefinition {
            name: name.clone(),
            description: role.description.clone(),
            permissions: role.permissions.clone(),
            inherits: role.inherits.clone(),
        });
    }

    for (user_id, user) in users {
        policy.set_user(UserPermissions {
            user_id: user_id.clone(),
            roles: user.roles.clone(),
            custom: user.custom.clone(),
            denied: user.denied.clone(),
        });
    }

    policy
}
