//! Admission limits: request-rate token buckets and cost quotas.

pub mod quota;
pub mod rate_limit;

pub use quota::{CostQuota, QuotaDenial, QuotaUsage, QuotaWindow, UsageStats};
pub use rate_limit::{RateLimit, RateScope, TokenBucket};
