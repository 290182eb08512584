//! Dependency injection
//!
//! Builds the admission controller, execution engine and tool registry from
//! a loaded [`FileConfig`]. All services share one in-memory state store.

use anyhow::{Result, bail};
use std::sync::Arc;
use toolgate_application::{
    AdmissionController, Clock, ExecutionEngine, GatewayStateStore, InMemoryStateStore,
    PermissionChecker, QuotaTracker, RateLimiter, SystemClock,
};
use toolgate_infrastructure::{FileConfig, StaticToolRegistry};
use tracing::warn;

pub struct Gateway {
    pub registry: Arc<StaticToolRegistry>,
    pub admission: Arc<AdmissionController>,
    pub engine: Arc<ExecutionEngine>,
}

impl Gateway {
    /// Wire every service from `config`. Fails if the config does not validate.
    pub fn from_config(config: &FileConfig) -> Result<Self> {
        let problems = config.validate();
        if !problems.is_empty() {
            for problem in &problems {
                warn!("{}", problem);
            }
            bail!(
                "invalid configuration: {}",
                problems
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }

        let store: Arc<dyn GatewayStateStore> = Arc::new(InMemoryStateStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let permissions = Arc::new(PermissionChecker::new(config.to_permission_policy()));

        let rate_limiter = Arc::new(RateLimiter::new(
            store.clone(),
            clock.clone(),
            config.rate_limits.to_defaults(),
        ));
        for (scope_key, limit) in &config.rate_limits.overrides {
            rate_limiter.set_limit(scope_key.clone(), limit.to_rate_limit());
        }

        let quota = Arc::new(QuotaTracker::new(
            store.clone(),
            clock.clone(),
            config.quotas.default_quota(),
        ));
        for (user_id, user_quota) in &config.quotas.users {
            quota.set_quota(user_id.clone(), *user_quota);
        }

        let admission = Arc::new(
            AdmissionController::new(permissions, rate_limiter, quota)
                .with_sanitizer(config.to_sanitizer()),
        );
        let engine = Arc::new(ExecutionEngine::new(
            store,
            clock,
            config.engine.to_engine_config(),
        ));

        let mut registry = StaticToolRegistry::with_builtins();
        for name in registry.apply_overrides(&config.tools) {
            warn!(tool = %name, "Override for unknown tool ignored");
        }

        Ok(Self {
            registry: Arc::new(registry),
            admission,
            engine,
        })
    }
}
