//! Stateful services backing the admission gates.

pub mod permission_checker;
pub mod quota_tracker;
pub mod rate_limiter;

pub use permission_checker::PermissionChecker;
pub use quota_tracker::QuotaTracker;
pub use rate_limiter::{RateLimitDefaults, RateLimiter};
