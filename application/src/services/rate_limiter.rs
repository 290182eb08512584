//! Rate limiter service
//!
//! Checks the user, tool and global buckets of a call, in that order, and
//! stops at the first denial. Tokens already taken from an earlier scope are
//! kept when a later scope denies: a call refused by the global bucket still
//! counts against the user's and the tool's budgets.

use crate::ports::clock::Clock;
use crate::ports::state_store::GatewayStateStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use toolgate_domain::{RateLimit, RateScope, ToolError};
use tracing::warn;

/// Limits applied to scopes without an explicit override.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitDefaults {
    pub per_user: Option<RateLimit>,
    pub per_tool: Option<RateLimit>,
    pub global: Option<RateLimit>,
}

impl RateLimitDefaults {
    fn for_scope(&self, scope: &RateScope) -> Option<RateLimit> {
        match scope {
            RateScope::User(_) => self.per_user,
            RateScope::Tool(_) => self.per_tool,
            RateScope::Global => self.global,
        }
    }
}

pub struct RateLimiter {
    store: Arc<dyn GatewayStateStore>,
    clock: Arc<dyn Clock>,
    defaults: RateLimitDefaults,
    overrides: RwLock<HashMap<String, RateLimit>>,
}

impl RateLimiter {
    pub fn new(
        store: Arc<dyn GatewayStateStore>,
        clock: Arc<dyn Clock>,
        defaults: RateLimitDefaults,
    ) -> Self {
        Self {
            store,
            clock,
            defaults,
            overrides: RwLock::new(HashMap::new()),
        }
    }

    /// Set the limit for one scope key (`user:<id>`, `tool:<name>`, `global`).
    pub fn set_limit(&self, scope_key: impl Into<String>, limit: RateLimit) {
        self.overrides
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(scope_key.into(), limit);
    }

    pub fn remove_limit(&self, scope_key: &str) {
        self.overrides
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(scope_key);
    }

    /// Effective limit for `scope`: override, else default, else unlimited.
    pub fn limit_for(&self, scope: &RateScope) -> Option<RateLimit> {
        self.overrides
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&scope.key())
            .copied()
            .or_else(|| self.defaults.for_scope(scope))
    }

    pub async fn check(&self, user_id: &str, tool_name: &str) -> Result<(), ToolError> {
        let now = self.clock.now();
        for scope in RateScope::for_call(user_id, tool_name) {
            let Some(limit) = self.limit_for(&scope) else {
                continue;
            };
            if let Err(retry_after) = self.store.consume_token(&scope.key(), limit, now).await {
                warn!(
                    "Rate limit hit for {} (retry after {}ms)",
                    scope,
                    retry_after.as_millis()
                );
                return Err(ToolError::rate_limited(&scope.key(), retry_after));
            }
        }
        Ok(())
    }
}
