//! Per-user cost quotas over UTC calendar windows.
//!
//! Spend is pre-charged: a call's estimated cost is committed to both the
//! daily and monthly counters as soon as it is admitted, whether or not the
//! handler later succeeds.

use crate::core::error::ToolError;
use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

// Absorbs float noise when spend lands exactly on the ceiling.
const EPSILON: f64 = 1e-9;

/// Spend ceilings; `None` means unlimited for that window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostQuota {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_per_day: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost_per_month: Option<f64>,
}

impl CostQuota {
    pub fn new(max_cost_per_day: Option<f64>, max_cost_per_month: Option<f64>) -> Self {
        Self {
            max_cost_per_day,
            max_cost_per_month,
        }
    }

    pub fn daily(limit: f64) -> Self {
        Self::new(Some(limit), None)
    }

    pub fn is_unlimited(&self) -> bool {
        self.max_cost_per_day.is_none() && self.max_cost_per_month.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaWindow {
    Daily,
    Monthly,
}

impl QuotaWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuotaWindow::Daily => "daily",
            QuotaWindow::Monthly => "monthly",
        }
    }

    /// Start of the window containing `now`.
    pub fn start_of(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let date = now.date_naive();
        let first = match self {
            QuotaWindow::Daily => date,
            QuotaWindow::Monthly => date - Days::new(u64::from(date.day0())),
        };
        first.and_time(NaiveTime::MIN).and_utc()
    }

    /// Start of the window following the one that starts at `start`.
    pub fn next_reset(&self, start: DateTime<Utc>) -> DateTime<Utc> {
        let date = start.date_naive();
        let next = match self {
            QuotaWindow::Daily => date.checked_add_days(Days::new(1)),
            QuotaWindow::Monthly => date.checked_add_months(Months::new(1)),
        };
        next.unwrap_or(NaiveDate::MAX)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }
}

/// Why a charge was refused.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotaDenial {
    pub window: QuotaWindow,
    pub remaining: f64,
    pub reset_at: DateTime<Utc>,
}

impl QuotaDenial {
    pub fn to_tool_error(&self) -> ToolError {
        ToolError::quota_exceeded(self.window.as_str(), self.remaining, self.reset_at)
    }
}

/// Running totals for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaUsage {
    pub day_start: DateTime<Utc>,
    pub daily_spent: f64,
    pub month_start: DateTime<Utc>,
    pub monthly_spent: f64,
}

impl QuotaUsage {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day_start: QuotaWindow::Daily.start_of(now),
            daily_spent: 0.0,
            month_start: QuotaWindow::Monthly.start_of(now),
            monthly_spent: 0.0,
        }
    }

    /// Reset whichever counters belong to an elapsed window.
    pub fn roll(&mut self, now: DateTime<Utc>) {
        let day_start = QuotaWindow::Daily.start_of(now);
        if day_start > self.day_start {
            self.day_start = day_start;
            self.daily_spent = 0.0;
        }
        let month_start = QuotaWindow::Monthly.start_of(now);
        if month_start > self.month_start {
            self.month_start = month_start;
            self.monthly_spent = 0.0;
        }
    }

    pub fn daily_reset_at(&self) -> DateTime<Utc> {
        QuotaWindow::Daily.next_reset(self.day_start)
    }

    pub fn monthly_reset_at(&self) -> DateTime<Utc> {
        QuotaWindow::Monthly.next_reset(self.month_start)
    }

    /// Check `cost` against both ceilings and commit it if it fits.
    pub fn try_charge(
        &mut self,
        quota: &CostQuota,
        cost: f64,
        now: DateTime<Utc>,
    ) -> Result<(), QuotaDenial> {
        self.roll(now);
        let cost = cost.max(0.0);

        if let Some(limit) = quota.max_cost_per_day {
            if self.daily_spent + cost > limit + EPSILON {
                return Err(QuotaDenial {
                    window: QuotaWindow::Daily,
                    remaining: (limit - self.daily_spent).max(0.0),
                    reset_at: self.daily_reset_at(),
                });
            }
        }
        if let Some(limit) = quota.max_cost_per_month {
            if self.monthly_spent + cost > limit + EPSILON {
                return Err(QuotaDenial {
                    window: QuotaWindow::Monthly,
                    remaining: (limit - self.monthly_spent).max(0.0),
                    reset_at: self.monthly_reset_at(),
                });
            }
        }

        self.daily_spent += cost;
        self.monthly_spent += cost;
        Ok(())
    }
}

/// Usage report for one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub user_id: String,
    pub daily_spent: f64,
    pub monthly_spent: f64,
    pub daily_limit: Option<f64>,
    pub monthly_limit: Option<f64>,
    pub daily_remaining: Option<f64>,
    pub monthly_remaining: Option<f64>,
    pub daily_reset_at: DateTime<Utc>,
    pub monthly_reset_at: DateTime<Utc>,
}

impl UsageStats {
    pub fn from_usage(
        user_id: impl Into<String>,
        usage: &QuotaUsage,
        quota: &CostQuota,
        now: DateTime<Utc>,
    ) -> Self {
        let mut usage = usage.clone();
        usage.roll(now);
        Self {
            user_id: user_id.into(),
            daily_spent: usage.daily_spent,
            monthly_spent: usage.monthly_spent,
            daily_limit: quota.max_cost_per_day,
            monthly_limit: quota.max_cost_per_month,
            daily_remaining: quota
                .max_cost_per_day
                .map(|l| (l - usage.daily_spent).max(0.0)),
            monthly_remaining: quota
                .max_cost_per_month
                .map(|l| (l - usage.monthly_spent).max(0.0)),
            daily_reset_at: usage.daily_reset_at(),
            monthly_reset_at: usage.monthly_reset_at(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ErrorCode;
    use chrono::TimeDelta;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_daily_ceiling_scenario() {
        let now = at("2026-05-14T09:30:00Z");
        let quota = CostQuota::daily(10.0);
        let mut usage = QuotaUsage::new(now);

        assert!(usage.try_charge(&quota, 6.0, now).is_ok());
        assert_eq!(usage.daily_spent, 6.0);

        let denial = usage.try_charge(&quota, 5.0, now).unwrap_err();
        assert_eq!(denial.window, QuotaWindow::Daily);
        assert_eq!(denial.remaining, 4.0);
        assert_eq!(denial.reset_at, at("2026-05-15T00:00:00Z"));
        assert_eq!(usage.daily_spent, 6.0);

        let err = denial.to_tool_error();
        assert_eq!(err.code, ErrorCode::QuotaExceeded);
        assert_eq!(err.remaining, Some(4.0));
    }

    #[test]
    fn test_exact_ceiling_is_allowed() {
        let now = at("2026-05-14T09:30:00Z");
        let quota = CostQuota::daily(1.0);
        let mut usage = QuotaUsage::new(now);
        for _ in 0..10 {
            usage.try_charge(&quota, 0.1, now).unwrap();
        }
        assert!(usage.try_charge(&quota, 0.1, now).is_err());
    }

    #[test]
    fn test_monthly_ceiling() {
        let now = at("2026-05-14T09:30:00Z");
        let quota = CostQuota::new(None, Some(3.0));
        let mut usage = QuotaUsage::new(now);

        usage.try_charge(&quota, 2.0, now).unwrap();
        let next_day = now + TimeDelta::days(1);
        let denial = usage.try_charge(&quota, 2.0, next_day).unwrap_err();
        assert_eq!(denial.window, QuotaWindow::Monthly);
        assert_eq!(denial.remaining, 1.0);
        assert_eq!(denial.reset_at, at("2026-06-01T00:00:00Z"));
    }

    #[test]
    fn test_windows_reset_at_boundaries() {
        let quota = CostQuota::new(Some(5.0), Some(100.0));
        let mut usage = QuotaUsage::new(at("2026-01-31T23:59:00Z"));
        usage.try_charge(&quota, 5.0, at("2026-01-31T23:59:00Z")).unwrap();
        assert!(usage.try_charge(&quota, 1.0, at("2026-01-31T23:59:59Z")).is_err());

        usage.try_charge(&quota, 1.0, at("2026-02-01T00:00:00Z")).unwrap();
        assert_eq!(usage.daily_spent, 1.0);
        assert_eq!(usage.monthly_spent, 1.0);
        assert_eq!(usage.monthly_reset_at(), at("2026-03-01T00:00:00Z"));
    }

    #[test]
    fn test_unlimited_quota_still_tracks_spend() {
        let now = at("2026-05-14T09:30:00Z");
        let quota = CostQuota::default();
        assert!(quota.is_unlimited());

        let mut usage = QuotaUsage::new(now);
        usage.try_charge(&quota, 1000.0, now).unwrap();

        let stats = UsageStats::from_usage("u", &usage, &quota, now);
        assert_eq!(stats.daily_spent, 1000.0);
        assert!(stats.daily_remaining.is_none());
    }

    #[test]
    fn test_usage_stats_after_rollover() {
        let now = at("2026-05-14T09:30:00Z");
        let quota = CostQuota::new(Some(10.0), Some(50.0));
        let mut usage = QuotaUsage::new(now);
        usage.try_charge(&quota, 7.5, now).unwrap();

        let stats = UsageStats::from_usage("u", &usage, &quota, now);
        assert_eq!(stats.daily_remaining, Some(2.5));
        assert_eq!(stats.monthly_remaining, Some(42.5));

        let tomorrow = UsageStats::from_usage("u", &usage, &quota, now + TimeDelta::days(1));
        assert_eq!(tomorrow.daily_spent, 0.0);
        assert_eq!(tomorrow.monthly_spent, 7.5);
    }
}
