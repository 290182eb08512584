//! Cost quota tracker service
//!
//! Pre-charges a call's estimated cost against the caller's daily and
//! monthly ceilings at admission time. The charge is not returned if the
//! handler later fails.

use crate::ports::clock::Clock;
use crate::ports::state_store::GatewayStateStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use toolgate_domain::{CostQuota, QuotaUsage, ToolError, UsageStats};
use tracing::warn;

pub struct QuotaTracker {
    store: Arc<dyn GatewayStateStore>,
    clock: Arc<dyn Clock>,
    default_quota: CostQuota,
    quotas: RwLock<HashMap<String, CostQuota>>,
}

impl QuotaTracker {
    pub fn new(
        store: Arc<dyn GatewayStateStore>,
        clock: Arc<dyn Clock>,
        default_quota: CostQuota,
    ) -> Self {
        Self {
            store,
            clock,
            default_quota,
            quotas: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_quota(&self, user_id: impl Into<String>, quota: CostQuota) {
        self.quotas
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id.into(), quota);
    }

    /// The user's quota, falling back to the default.
    pub fn quota_for(&self, user_id: &str) -> CostQuota {
        self.quotas
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .copied()
            .unwrap_or(self.default_quota)
    }

    pub async fn check_and_charge(&self, user_id: &str, cost: f64) -> Result<(), ToolError> {
        let quota = self.quota_for(user_id);
        let now = self.clock.now();
        self.store
            .charge_quota(user_id, &quota, cost, now)
            .await
            .map_err(|denial| {
                warn!(
                    "{} quota exhausted for {} ({:.4} remaining)",
                    denial.window.as_str(),
                    user_id,
                    denial.remaining
                );
                denial.to_tool_error()
            })
    }

    pub async fn get_usage(&self, user_id: &str) -> UsageStats {
        let now = self.clock.now();
        let usage = self
            .store
            .quota_usage(user_id)
            .await
            .unwrap_or_else(|| QuotaUsage::new(now));
        UsageStats::from_usage(user_id, &usage, &self.quota_for(user_id), now)
    }
}
