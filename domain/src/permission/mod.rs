//! Role-based access control for tool calls.
//!
//! A user is granted a call when, after the deny-list check, at least one of
//! the permissions collected from their roles (following inheritance) or
//! their custom grants matches the tool name, the operation and every
//! attached condition.

pub mod entities;
pub mod pattern;
pub mod policy;

pub use entities::{
    ConditionOperator, Permission, PermissionCondition, RoleDefinition, UserPermissions,
};
pub use pattern::wildcard_matches;
pub use policy::{
    ADMIN_ROLE, AGENT_ROLE, DEVELOPER_ROLE, PermissionDecision, PermissionPolicy, VIEWER_ROLE,
    default_roles,
};
