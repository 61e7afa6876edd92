//! Cross-account analytics report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event counts by outcome within the report window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutcomeTotals {
    pub acquired: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub rate_limited: u64,
    pub released: u64,
    pub disabled: u64,
    pub reactivated: u64,
}

impl OutcomeTotals {
    /// Reports that carried an outcome from the external call.
    pub const fn reported(&self) -> u64 {
        self.succeeded + self.failed + self.rate_limited
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountScore {
    pub account_id: String,
    pub health_score: f64,
}

/// Snapshot of the current pool, independent of the window.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PoolSummary {
    pub total_accounts: u64,
    /// Accounts in a selectable state
    pub available: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_role: BTreeMap<String, u64>,
    pub avg_health: f64,
    pub best: Option<AccountScore>,
    pub worst: Option<AccountScore>,
}

/// Output of the aggregator, also the payload of every export format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregateReport {
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// `acquired` events per action type
    pub usage_by_action: BTreeMap<String, u64>,
    pub outcomes: OutcomeTotals,
    /// succeeded / reported, 0 when nothing was reported
    pub success_rate: f64,
    pub avg_health_by_role: BTreeMap<String, f64>,
    pub pool: PoolSummary,
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Records whose health score moved
    pub rescored: usize,
    /// Rate-limited accounts restored after their window rolled over
    pub recovered: usize,
    /// Leases dropped because their TTL ran out
    pub expired_leases: usize,
}
