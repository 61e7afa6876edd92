//! Account store abstraction.
//!
//! The store exclusively owns persisted `AccountRecord`s and the append-only
//! event log. The dispatcher holds no durable state of its own, so a crash
//! loses at most in-flight leases.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use relaypool_types::{AccountFilter, AccountRecord, EventLogEntry, EventQuery, Result};

/// Durable repository of accounts and their history.
///
/// Implementations must make every write atomic with respect to concurrent
/// readers: a reader sees either the old record or the new one.
pub trait AccountStore: Send + Sync {
    /// Fails with `NotFound` if absent.
    fn get(&self, account_id: &str) -> Result<AccountRecord>;

    /// Matching records ordered by [`compare_by_fairness`].
    fn list(&self, filter: &AccountFilter) -> Result<Vec<AccountRecord>>;

    /// Register a new account. Fails with `AlreadyExists` on a duplicate id.
    fn insert(&self, record: &AccountRecord, events: &[EventLogEntry]) -> Result<()>;

    /// Upsert.
    fn save(&self, record: &AccountRecord) -> Result<()> {
        self.commit(record, &[])
    }

    /// Remove an account. Its history stays in the event log.
    fn remove(&self, account_id: &str, events: &[EventLogEntry]) -> Result<()>;

    /// Append one entry. Timestamps never go backwards in the log.
    fn append_event(&self, entry: &EventLogEntry) -> Result<()>;

    /// Upsert `record` and append `events` as one unit.
    fn commit(&self, record: &AccountRecord, events: &[EventLogEntry]) -> Result<()>;

    /// Scan the log, oldest first.
    fn events(&self, query: &EventQuery) -> Result<Vec<EventLogEntry>>;

    /// Zero every daily budget. Returns false (and changes nothing) when
    /// already done for `today`.
    fn reset_daily_counters(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<bool>;
}

/// Highest health first, then least recently used (never-used first), then id.
pub fn compare_by_fairness(a: &AccountRecord, b: &AccountRecord) -> Ordering {
    b.health_score
        .total_cmp(&a.health_score)
        .then_with(|| match (a.last_used_at, b.last_used_at) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(x), Some(y)) => x.cmp(&y),
        })
        .then_with(|| a.account_id.cmp(&b.account_id))
}

/// Reset daily budgets of one record. Returns true if anything changed.
pub(crate) fn reset_daily_budgets(record: &mut AccountRecord, now: DateTime<Utc>) -> bool {
    let mut touched = false;
    for budget in record.budgets.values_mut().filter(|b| b.is_daily()) {
        budget.reset(now);
        touched = true;
    }
    touched
}

/// Clamp `entry` so it is not older than the last logged event.
pub(crate) fn monotonic(entry: &EventLogEntry, last: Option<DateTime<Utc>>) -> EventLogEntry {
    let mut entry = entry.clone();
    if let Some(last) = last {
        if entry.timestamp < last {
            entry.timestamp = last;
        }
    }
    entry
}

/// Keep the newest `limit` entries of an oldest-first list.
pub(crate) fn keep_newest(mut entries: Vec<EventLogEntry>, limit: Option<usize>) -> Vec<EventLogEntry> {
    if let Some(limit) = limit {
        if entries.len() > limit {
            entries.drain(..entries.len() - limit);
        }
    }
    entries
}

#[cfg(test)]
mod tests;
