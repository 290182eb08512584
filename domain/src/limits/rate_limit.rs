//! Token-bucket rate limiting.
//!
//! A bucket holds up to `max_requests` tokens and refills continuously at
//! `max_requests / window`. Each admitted call takes one token.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bucket capacity and refill window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub max_requests: u32,
    pub window_ms: u64,
}

impl RateLimit {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_ms: u64::try_from(window.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn per_second(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    pub fn per_minute(max_requests: u32) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    fn capacity(&self) -> f64 {
        f64::from(self.max_requests)
    }
}

/// What a bucket limits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RateScope {
    User(String),
    Tool(String),
    Global,
}

impl RateScope {
    /// Store key: `user:<id>`, `tool:<name>` or `global`.
    pub fn key(&self) -> String {
        match self {
            RateScope::User(id) => format!("user:{}", id),
            RateScope::Tool(name) => format!("tool:{}", name),
            RateScope::Global => "global".to_string(),
        }
    }

    /// Scopes checked for one call, in checking order.
    pub fn for_call(user_id: &str, tool_name: &str) -> [RateScope; 3] {
        [
            RateScope::User(user_id.to_string()),
            RateScope::Tool(tool_name.to_string()),
            RateScope::Global,
        ]
    }
}

impl std::fmt::Display for RateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenBucket {
    tokens: f64,
    last_refill: DateTime<Utc>,
    limit: RateLimit,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(limit: RateLimit, now: DateTime<Utc>) -> Self {
        Self {
            tokens: limit.capacity(),
            last_refill: now,
            limit,
        }
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    pub fn limit(&self) -> RateLimit {
        self.limit
    }

    /// Apply a new limit, keeping the current level clamped to the new capacity.
    pub fn reconfigure(&mut self, limit: RateLimit) {
        if self.limit != limit {
            self.limit = limit;
            self.tokens = self.tokens.min(limit.capacity());
        }
    }

    fn refill(&mut self, now: DateTime<Utc>) {
        // A clock that moved backwards refills nothing.
        let Ok(elapsed) = (now - self.last_refill).to_std() else {
            return;
        };
        let capacity = self.limit.capacity();
        if self.limit.window_ms == 0 {
            self.tokens = capacity;
        } else {
            let refill = elapsed.as_secs_f64() * 1000.0 * capacity / self.limit.window_ms as f64;
            self.tokens = (self.tokens + refill).min(capacity);
        }
        self.last_refill = now;
    }

    /// Take one token, or report how long until one is available.
    pub fn try_consume(&mut self, now: DateTime<Utc>) -> Result<(), Duration> {
        self.refill(now);

        if self.limit.max_requests == 0 {
            return Err(self.limit.window().max(Duration::from_millis(1)));
        }

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return Ok(());
        }

        let deficit = 1.0 - self.tokens;
        let wait_ms = (deficit * self.limit.window_ms as f64 / self.limit.capacity()).ceil();
        Err(Duration::from_millis((wait_ms as u64).max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_scope_keys() {
        assert_eq!(RateScope::User("alice".into()).key(), "user:alice");
        assert_eq!(RateScope::Tool("echo".into()).key(), "tool:echo");
        assert_eq!(RateScope::Global.key(), "global");

        let order: Vec<String> = RateScope::for_call("a", "t").iter().map(|s| s.key()).collect();
        assert_eq!(order, vec!["user:a", "tool:t", "global"]);
    }

    #[test]
    fn test_exhaust_then_deny_then_refill() {
        let capacity = 5;
        let window = Duration::from_secs(10);
        let mut bucket = TokenBucket::new(RateLimit::new(capacity, window), t0());

        for _ in 0..capacity {
            assert!(bucket.try_consume(t0()).is_ok());
        }
        let retry_after = bucket.try_consume(t0()).unwrap_err();
        assert!(retry_after > Duration::ZERO);
        assert_eq!(retry_after, Duration::from_secs(2));

        let later = t0() + TimeDelta::seconds(10);
        for _ in 0..capacity {
            assert!(bucket.try_consume(later).is_ok());
        }
        assert!(bucket.try_consume(later).is_err());
    }

    #[test]
    fn test_partial_refill() {
        let mut bucket = TokenBucket::new(RateLimit::new(2, Duration::from_secs(2)), t0());
        bucket.try_consume(t0()).unwrap();
        bucket.try_consume(t0()).unwrap();

        let half = t0() + TimeDelta::milliseconds(500);
        let retry = bucket.try_consume(half).unwrap_err();
        assert_eq!(retry, Duration::from_millis(500));

        let full_token = t0() + TimeDelta::seconds(1);
        assert!(bucket.try_consume(full_token).is_ok());
    }

    #[test]
    fn test_tokens_never_exceed_capacity() {
        let mut bucket = TokenBucket::new(RateLimit::per_second(3), t0());
        bucket.try_consume(t0() + TimeDelta::hours(5)).unwrap();
        assert!(bucket.tokens() <= 3.0);
        assert!(bucket.tokens() >= 0.0);
    }

    #[test]
    fn test_zero_capacity_always_denies() {
        let mut bucket = TokenBucket::new(RateLimit::per_minute(0), t0());
        assert_eq!(bucket.try_consume(t0()).unwrap_err(), Duration::from_secs(60));
    }

    #[test]
    fn test_reconfigure_clamps_tokens() {
        let mut bucket = TokenBucket::new(RateLimit::per_second(10), t0());
        bucket.reconfigure(RateLimit::per_second(2));
        assert_eq!(bucket.tokens(), 2.0);
        bucket.try_consume(t0()).unwrap();
        bucket.try_consume(t0()).unwrap();
        assert!(bucket.try_consume(t0()).is_err());
    }

    #[test]
    fn test_backwards_clock_does_not_refill() {
        let mut bucket = TokenBucket::new(RateLimit::per_second(1), t0());
        bucket.try_consume(t0()).unwrap();
        assert!(bucket.try_consume(t0() - TimeDelta::seconds(30)).is_err());
    }
}
