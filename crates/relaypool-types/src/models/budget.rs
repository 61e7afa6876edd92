//! Windowed rate budget for one (account, action type) pair.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Fixed-window quota tracker.
///
/// The window is rolled lazily on access: `used_in_window` drops to zero and
/// the window restarts only once `now` is past `window_started_at +
/// window_secs`. There is no background sweep, so a reset can never race
/// with a reservation performed under the account lock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateBudget {
    pub action_type: String,
    pub window_secs: i64,
    pub limit: u32,
    pub used_in_window: u32,
    pub window_started_at: DateTime<Utc>,
}

/// Windows at least this long are reset by the daily maintenance pass.
pub const DAILY_WINDOW_SECS: i64 = 86_400;

/// Upper bound for any window, TTL or lookback (ten years).
pub const MAX_WINDOW_SECS: i64 = 10 * 365 * DAILY_WINDOW_SECS;

impl RateBudget {
    pub fn new(action_type: impl Into<String>, limit: u32, window_secs: i64, now: DateTime<Utc>) -> Self {
        Self {
            action_type: action_type.into(),
            window_secs,
            limit,
            used_in_window: 0,
            window_started_at: now,
        }
    }

    /// Saturates at the end of representable time.
    pub fn window_ends_at(&self) -> DateTime<Utc> {
        Duration::try_seconds(self.window_secs)
            .and_then(|window| self.window_started_at.checked_add_signed(window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Why this budget cannot be enforced, if it cannot.
    pub fn problem(&self) -> Option<&'static str> {
        if self.limit == 0 {
            Some("limit must be positive")
        } else if self.window_secs <= 0 || self.window_secs > MAX_WINDOW_SECS {
            Some("window_secs must be positive and at most ten years")
        } else {
            None
        }
    }

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.window_ends_at()
    }

    /// Start a fresh window if the current one is over. Returns true if it rolled.
    pub fn roll_if_expired(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_expired(now) {
            self.used_in_window = 0;
            self.window_started_at = now;
            true
        } else {
            false
        }
    }

    /// Reserve one unit. Exhaustion is reported as `false`, not as an error.
    pub fn try_reserve(&mut self, now: DateTime<Utc>) -> bool {
        self.roll_if_expired(now);
        if self.used_in_window < self.limit {
            self.used_in_window += 1;
            true
        } else {
            false
        }
    }

    /// Give back one unreserved unit, floored at zero.
    ///
    /// A reservation made in a window that has since rolled over is already
    /// gone, so rolling first makes this a no-op in that case.
    pub fn release(&mut self, now: DateTime<Utc>) {
        self.roll_if_expired(now);
        self.used_in_window = self.used_in_window.saturating_sub(1);
    }

    /// Units still available at `now`, without mutating the window.
    pub fn remaining(&self, now: DateTime<Utc>) -> u32 {
        if self.is_expired(now) {
            self.limit
        } else {
            self.limit.saturating_sub(self.used_in_window)
        }
    }

    /// Mark the window as fully used. The upstream service's 429 wins over
    /// our local estimate.
    pub fn force_exhaust(&mut self, now: DateTime<Utc>) {
        self.roll_if_expired(now);
        self.used_in_window = self.limit;
    }

    /// Unconditional reset used by daily maintenance.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.used_in_window = 0;
        self.window_started_at = now;
    }

    pub const fn is_daily(&self) -> bool {
        self.window_secs >= DAILY_WINDOW_SECS
    }
}
