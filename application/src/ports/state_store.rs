//! Shared gateway state port
//!
//! Rate-limit buckets, quota counters and circuit breakers are shared by
//! every conversation running against the same gateway. All reads and
//! writes go through one [`GatewayStateStore`]; each method is a single
//! atomic read-modify-write, so concurrent callers never interleave inside
//! one bucket, counter or breaker.
//!
//! [`InMemoryStateStore`] serves a single process (and tests). A deployment
//! with several gateway instances plugs in a store backed by shared storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use toolgate_domain::{
    CircuitBreaker, CircuitBreakerConfig, CircuitPermit, CircuitState, CostQuota, QuotaDenial,
    QuotaUsage, RateLimit, TokenBucket,
};

#[async_trait]
pub trait GatewayStateStore: Send + Sync {
    /// Take one token from the bucket at `scope_key`, creating a full bucket
    /// on first use. `Err` carries the retry-after hint.
    async fn consume_token(
        &self,
        scope_key: &str,
        limit: RateLimit,
        now: DateTime<Utc>,
    ) -> Result<(), Duration>;

    /// Check `cost` against `quota` for `user_id` and commit it if it fits.
    async fn charge_quota(
        &self,
        user_id: &str,
        quota: &CostQuota,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaDenial>;

    async fn quota_usage(&self, user_id: &str) -> Option<QuotaUsage>;

    async fn acquire_circuit(
        &self,
        tool: &str,
        config: &CircuitBreakerConfig,
        now: DateTime<Utc>,
    ) -> Result<CircuitPermit, Duration>;

    /// Record a success; returns the resulting state.
    async fn record_circuit_success(&self, tool: &str, permit: CircuitPermit) -> CircuitState;

    /// Record a failure; returns the resulting state.
    async fn record_circuit_failure(
        &self,
        tool: &str,
        permit: CircuitPermit,
        config: &CircuitBreakerConfig,
        now: DateTime<Utc>,
    ) -> CircuitState;

    async fn circuit_state(&self, tool: &str) -> CircuitState;
}

/// Process-local state store.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    quotas: Mutex<HashMap<String, QuotaUsage>>,
    circuits: Mutex<HashMap<String, CircuitBreaker>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current token level of a bucket (diagnostics).
    pub fn bucket_tokens(&self, scope_key: &str) -> Option<f64> {
        lock(&self.buckets).get(scope_key).map(TokenBucket::tokens)
    }
}

// A panic while holding one of these locks cannot leave a half-written
// entry behind, so a poisoned map is still usable.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl GatewayStateStore for InMemoryStateStore {
    async fn consume_token(
        &self,
        scope_key: &str,
        limit: RateLimit,
        now: DateTime<Utc>,
    ) -> Result<(), Duration> {
        let mut buckets = lock(&self.buckets);
        let bucket = buckets
            .entry(scope_key.to_string())
            .or_insert_with(|| TokenBucket::new(limit, now));
        bucket.reconfigure(limit);
        bucket.try_consume(now)
    }

    async fn charge_quota(
        &self,
        user_id: &str,
        quota: &CostQuota,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaDenial> {
        let mut quotas = lock(&self.quotas);
        quotas
            .entry(user_id.to_string())
            .or_insert_with(|| QuotaUsage::new(now))
            .try_charge(quota, cost, now)
    }

    async fn quota_usage(&self, user_id: &str) -> Option<QuotaUsage> {
        lock(&self.quotas).get(user_id).cloned()
    }

    async fn acquire_circuit(
        &self,
        tool: &str,
        config: &CircuitBreakerConfig,
        now: DateTime<Utc>,
    ) -> Result<CircuitPermit, Duration> {
        lock(&self.circuits)
            .entry(tool.to_string())
            .or_default()
            .try_acquire(config, now)
    }

    async fn record_circuit_success(&self, tool: &str, permit: CircuitPermit) -> CircuitState {
        let mut circuits = lock(&self.circuits);
        let breaker = circuits.entry(tool.to_string()).or_default();
        breaker.record_success(permit);
        breaker.state()
    }

    async fn record_circuit_failure(
        &self,
        tool: &str,
        permit: CircuitPermit,
        config: &CircuitBreakerConfig,
        now: DateTime<Utc>,
    ) -> CircuitState {
        let mut circuits = lock(&self.circuits);
        let breaker = circuits.entry(tool.to_string()).or_default();
        breaker.record_failure(permit, config, now);
        breaker.state()
    }

    async fn circuit_state(&self, tool: &str) -> CircuitState {
        lock(&self.circuits)
            .get(tool)
            .map(CircuitBreaker::state)
            .unwrap_or(CircuitState::Closed)
    }
}
