//! Per-tool circuit breaker state machine.
//!
//! ```text
//!            N failures within window
//!   Closed ─────────────────────────────▶ Open
//!     ▲                                    │ cooldown elapsed
//!     │ trial succeeds                     ▼
//!     └─────────────────────────────── HalfOpen ──trial fails──▶ Open
//! ```
//!
//! Callers ask for a [`CircuitPermit`] before invoking a handler and report
//! the outcome with the same permit. Only the outcome of a `Trial` permit can
//! close or reopen a half-open circuit; stragglers holding a `Normal` permit
//! from before the circuit opened are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// All failures of an opening streak must fall within this span
    pub failure_window: Duration,
    /// How long the circuit stays open before a trial is allowed
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_failure_window(mut self, window: Duration) -> Self {
        self.failure_window = window;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

/// Proof that a call was let through, and in which capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitPermit {
    Normal,
    Trial,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreaker {
    state: CircuitState,
    consecutive_failures: u32,
    streak_started_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
    opened_at: Option<DateTime<Utc>>,
    trial_started_at: Option<DateTime<Utc>>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed_since(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    since
        .and_then(|t| (now - t).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            streak_started_at: None,
            last_failure_at: None,
            opened_at: None,
            trial_started_at: None,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_failure_at(&self) -> Option<DateTime<Utc>> {
        self.last_failure_at
    }

    /// Ask to make a call. `Err` carries the time until a call may be tried.
    pub fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig,
        now: DateTime<Utc>,
    ) -> Result<CircuitPermit, Duration> {
        match self.state {
            CircuitState::Closed => Ok(CircuitPermit::Normal),
            CircuitState::Open => {
                let elapsed = elapsed_since(self.opened_at, now);
                if elapsed >= config.cooldown {
                    self.state = CircuitState::HalfOpen;
                    self.trial_started_at = Some(now);
                    Ok(CircuitPermit::Trial)
                } else {
                    Err(config.cooldown - elapsed)
                }
            }
            CircuitState::HalfOpen => {
                // A trial that never reported back (its caller was cancelled)
                // is abandoned after a full cooldown.
                let elapsed = elapsed_since(self.trial_started_at, now);
                if elapsed >= config.cooldown {
                    self.trial_started_at = Some(now);
                    Ok(CircuitPermit::Trial)
                } else {
                    Err(config.cooldown - elapsed)
                }
            }
        }
    }

    pub fn record_success(&mut self, permit: CircuitPermit) {
        match (self.state, permit) {
            (CircuitState::Closed, _) => {
                self.consecutive_failures = 0;
                self.streak_started_at = None;
            }
            (CircuitState::HalfOpen, CircuitPermit::Trial) => {
                *self = Self::new();
            }
            _ => {}
        }
    }

    pub fn record_failure(
        &mut self,
        permit: CircuitPermit,
        config: &CircuitBreakerConfig,
        now: DateTime<Utc>,
    ) {
        match (self.state, permit) {
            (CircuitState::Closed, _) => {
                // The window is anchored at the first failure of the streak
                if self.streak_started_at.is_none()
                    || elapsed_since(self.streak_started_at, now) > config.failure_window
                {
                    self.consecutive_failures = 0;
                    self.streak_started_at = Some(now);
                }
                self.consecutive_failures += 1;
                self.last_failure_at = Some(now);
                if self.consecutive_failures >= config.failure_threshold.max(1) {
                    self.open(now);
                }
            }
            (CircuitState::HalfOpen, CircuitPermit::Trial) => {
                self.last_failure_at = Some(now);
                self.open(now);
            }
            _ => {}
        }
    }

    fn open(&mut self, now: DateTime<Utc>) {
        self.state = CircuitState::Open;
        self.streak_started_at = None;
        self.opened_at = Some(now);
        self.trial_started_at = None;
    }
}
