//! Adaptive outbound rate-limit gate
//!
//! Tracks the publish transport's remaining request quota and reset
//! countdown as reported by response headers, and refuses to issue a
//! request the quota is known not to cover. The gate is deliberately
//! conservative: it trades an occasional extra delay for never sending a
//! request that is already futile, which would otherwise burn the rest of
//! an exhausted window on errors.
//!
//! State is a single owned struct behind one async mutex; every attempt's
//! read-modify-write is one critical section, shared by all accounts.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use thiserror::Error;
use tokio::sync::Mutex;

/// Response header carrying the remaining request count
pub const HEADER_REMAINING: &str = "x-rate-limit-remaining";

/// Response header carrying the seconds until the window resets
pub const HEADER_RESET: &str = "x-rate-limit-reset";

/// Conservative defaults, used until the first real response is observed
pub const DEFAULT_REMAINING: i64 = 10;
pub const DEFAULT_RESET_SECS: i64 = 15 * 60;

const THROTTLE_SLEEP_SECS: u64 = 15;
const PROBE_FLOOR: i64 = 10;

/// An attempt deliberately not sent because quota is believed exhausted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rate limit exhausted, remaining: {remaining}, reset in: {reset_secs}s")]
pub struct Throttled {
    pub remaining: i64,
    pub reset_secs: i64,
}

/// Tracked quota: remaining requests, reset countdown, last observation
#[derive(Debug, Clone)]
pub struct QuotaState {
    /// Remaining requests in the current window; synthetic between
    /// responses, authoritative right after one
    pub remaining: i64,

    /// Seconds until the window is believed to roll over
    pub reset_secs: i64,

    /// When quota headers were last observed; `None` until the first response
    pub observed_at: Option<DateTime<Utc>>,
}

impl QuotaState {
    fn starting(remaining: i64, reset_secs: i64) -> Self {
        Self {
            remaining,
            reset_secs,
            observed_at: None,
        }
    }
}

/// Gate wrapping every outbound publish-transport call
pub struct RateLimitGate {
    state: Mutex<QuotaState>,

    /// Sleep applied to a throttled attempt; also the synthetic countdown step
    throttle_sleep: Duration,

    /// Optimistic remaining count once the countdown elapses, enough to
    /// probe whether the server-side window rolled over
    probe_floor: i64,
}

impl RateLimitGate {
    /// Create a gate with the conservative default state
    pub fn new() -> Self {
        Self::with_state(DEFAULT_REMAINING, DEFAULT_RESET_SECS)
    }

    /// Create a gate with explicit starting quota
    pub fn with_state(remaining: i64, reset_secs: i64) -> Self {
        Self {
            state: Mutex::new(QuotaState::starting(remaining, reset_secs)),
            throttle_sleep: Duration::from_secs(THROTTLE_SLEEP_SECS),
            probe_floor: PROBE_FLOOR,
        }
    }

    /// Override the throttle sleep and probe floor
    pub fn with_throttle(mut self, sleep: Duration, probe_floor: i64) -> Self {
        self.throttle_sleep = sleep;
        self.probe_floor = probe_floor;
        self
    }

    /// Gate one outbound attempt.
    ///
    /// With quota believed left, decrements the synthetic remaining count
    /// and lets the request proceed. With remaining at or below one, sleeps
    /// the throttle interval, advances the countdown by the same amount
    /// (never below zero), optimistically restores the probe floor once the
    /// countdown elapses, and declines the attempt regardless; the caller
    /// retries on its next scheduled tick, not in a loop.
    pub async fn before_request(&self) -> Result<(), Throttled> {
        let mut state = self.state.lock().await;

        if state.remaining > 1 {
            // Synthetic estimate until the next response overwrites it
            state.remaining -= 1;
            return Ok(());
        }

        tokio::time::sleep(self.throttle_sleep).await;
        let step = self.throttle_sleep.as_secs() as i64;
        state.reset_secs = (state.reset_secs - step).max(0);

        if state.reset_secs == 0 {
            // The window has likely rolled over; allow a minimal probe so
            // the next attempt can fetch fresh quota headers
            state.remaining = self.probe_floor;
        }

        tracing::info!(
            remaining = state.remaining,
            reset_secs = state.reset_secs,
            "publish attempt throttled"
        );

        Err(Throttled {
            remaining: state.remaining,
            reset_secs: state.reset_secs,
        })
    }

    /// Absorb quota headers from a completed response.
    ///
    /// Each header that parses overwrites its field, replacing any
    /// synthetic estimate; a missing or malformed header leaves the prior
    /// value untouched.
    pub async fn after_response(&self, headers: &HeaderMap) {
        let remaining = header_value(headers, HEADER_REMAINING);
        let reset_secs = header_value(headers, HEADER_RESET);

        let mut state = self.state.lock().await;

        if let Some(remaining) = remaining {
            state.remaining = remaining.max(0);
        }
        if let Some(reset_secs) = reset_secs {
            state.reset_secs = reset_secs.max(0);
        }
        if remaining.is_some() || reset_secs.is_some() {
            state.observed_at = Some(Utc::now());
            tracing::info!(
                remaining = state.remaining,
                reset_secs = state.reset_secs,
                "quota headers observed"
            );
        } else {
            tracing::debug!("no quota headers on response, keeping prior state");
        }
    }

    /// Current state, for logging and tests
    pub async fn snapshot(&self) -> QuotaState {
        self.state.lock().await.clone()
    }
}

impl Default for RateLimitGate {
    fn default() -> Self {
        Self::new()
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
}
