mod acquire_tests;
mod lifecycle_tests;

use super::Dispatcher;
use crate::clock::ManualClock;
use crate::store::{AccountStore, MemoryStore};
use chrono::{DateTime, TimeZone, Utc};
use relaypool_types::{
    AccountRecord, AccountRole, Credentials, DispatchConfig, HealthSignals, RateBudget,
};
use std::sync::Arc;

pub(super) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 10, 0, 0).unwrap()
}

pub(super) struct Harness {
    pub dispatcher: Arc<Dispatcher>,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryStore>,
}

pub(super) fn harness() -> Harness {
    harness_with(DispatchConfig::default())
}

pub(super) fn harness_with(config: DispatchConfig) -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let store = Arc::new(MemoryStore::new());
    let dispatcher =
        Dispatcher::new(store.clone(), config).unwrap().with_clock(clock.clone());
    Harness { dispatcher: Arc::new(dispatcher), clock, store }
}

pub(super) fn account(id: &str, role: AccountRole) -> AccountRecord {
    let credentials = Credentials {
        api_key: format!("key-{id}-0123456789"),
        access_token: format!("tok-{id}-0123456789"),
        bearer_token: format!("AAAA-bearer-{id}-secretvalue-ZZZZ"),
        ..Default::default()
    };
    AccountRecord::new(id, role, credentials, t0()).with_username(format!("@{id}"))
}

pub(super) fn account_with_tweets(id: &str, role: AccountRole, limit: u32, window_secs: i64) -> AccountRecord {
    account(id, role).with_budget(RateBudget::new("tweet", limit, window_secs, t0()))
}

/// Signals that score well above a fresh account.
pub(super) fn strong_signals() -> HealthSignals {
    HealthSignals {
        engagement_rate: 0.04,
        follower_growth_7d: 100,
        authenticity: 0.9,
        violations: Vec::new(),
    }
}

pub(super) fn used(store: &MemoryStore, id: &str, action: &str) -> u32 {
    store.get(id).unwrap().budgets[action].used_in_window
}
