//! Rate limit and quota configuration (`[rate_limits]`, `[quotas]`)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use toolgate_application::RateLimitDefaults;
use toolgate_domain::{CostQuota, RateLimit};

/// One token-bucket limit as written in TOML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRateLimit {
    pub max_requests: u32,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_window_secs() -> u64 {
    60
}

impl FileRateLimit {
    pub fn to_rate_limit(self) -> RateLimit {
        RateLimit::new(self.max_requests, Duration::from_secs(self.window_secs))
    }
}

/// Raw rate limit configuration from TOML
///
/// # Example
///
/// ```toml
/// [rate_limits]
/// per_user = { max_requests = 60, window_secs = 60 }
/// global = { max_requests = 1000 }
///
/// [rate_limits.overrides]
/// "user:ci-bot" = { max_requests = 600, window_secs = 60 }
/// "tool:issues/create" = { max_requests = 10, window_secs = 60 }
/// ```
///
/// Scopes without a limit are unlimited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRateLimitsConfig {
    pub per_user: Option<FileRateLimit>,
    pub per_tool: Option<FileRateLimit>,
    pub global: Option<FileRateLimit>,
    /// Keyed by scope key (`user:<id>`, `tool:<name>`, `global`)
    pub overrides: BTreeMap<String, FileRateLimit>,
}

impl FileRateLimitsConfig {
    pub fn to_defaults(&self) -> RateLimitDefaults {
        RateLimitDefaults {
            per_user: self.per_user.map(FileRateLimit::to_rate_limit),
            per_tool: self.per_tool.map(FileRateLimit::to_rate_limit),
            global: self.global.map(FileRateLimit::to_rate_limit),
        }
    }

    /// Every configured limit with the name it is reported under.
    pub(super) fn all_limits(&self) -> Vec<(String, FileRateLimit)> {
        let mut limits = Vec::new();
        for (name, limit) in [
            ("per_user", self.per_user),
            ("per_tool", self.per_tool),
            ("global", self.global),
        ] {
            if let Some(limit) = limit {
                limits.push((format!("rate_limits.{}", name), limit));
            }
        }
        for (key, limit) in &self.overrides {
            limits.push((format!("rate_limits.overrides.\"{}\"", key), *limit));
        }
        limits
    }
}

/// Raw cost quota configuration from TOML
///
/// ```toml
/// [quotas]
/// max_cost_per_day = 5.0
/// max_cost_per_month = 50.0
///
/// [quotas.users.alice]
/// max_cost_per_day = 20.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileQuotasConfig {
    pub max_cost_per_day: Option<f64>,
    pub max_cost_per_month: Option<f64>,
    pub users: BTreeMap<String, CostQuota>,
}

impl FileQuotasConfig {
    pub fn default_quota(&self) -> CostQuota {
        CostQuota::new(self.max_cost_per_day, self.max_cost_per_month)
    }

    pub(super) fn all_ceilings(&self) -> Vec<(String, f64)> {
        let mut ceilings = Vec::new();
        let mut push = |field: String, value: Option<f64>| {
            if let Some(value) = value {
                ceilings.push((field, value));
            }
        };
        push("quotas.max_cost_per_day".to_string(), self.max_cost_per_day);
        push("quotas.max_cost_per_month".to_string(), self.max_cost_per_month);
        for (user, quota) in &self.users {
            push(format!("quotas.users.{}.max_cost_per_day", user), quota.max_cost_per_day);
            push(format!("quotas.users.{}.max_cost_per_month", user), quota.max_cost_per_month);
        }
        ceilings
    }
}
