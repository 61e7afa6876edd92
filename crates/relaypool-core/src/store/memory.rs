//! In-process store backed by locked maps. Nothing survives a restart.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use relaypool_types::{
    AccountError, AccountFilter, AccountRecord, EventLogEntry, EventQuery, PoolError, Result,
};

use super::{compare_by_fairness, keep_newest, monotonic, reset_daily_budgets, AccountStore};

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, AccountRecord>,
    events: Vec<EventLogEntry>,
    last_daily_reset: Option<NaiveDate>,
}

impl Inner {
    fn push_events(&mut self, events: &[EventLogEntry]) {
        for entry in events {
            let last = self.events.last().map(|e| e.timestamp);
            self.events.push(monotonic(entry, last));
        }
    }
}

/// A single lock guards records and log so `commit` is atomic.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AccountStore for MemoryStore {
    fn get(&self, account_id: &str) -> Result<AccountRecord> {
        self.inner
            .read()
            .accounts
            .get(account_id)
            .cloned()
            .ok_or_else(|| PoolError::not_found(account_id))
    }

    fn list(&self, filter: &AccountFilter) -> Result<Vec<AccountRecord>> {
        let mut records: Vec<AccountRecord> = self
            .inner
            .read()
            .accounts
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(compare_by_fairness);
        Ok(records)
    }

    fn insert(&self, record: &AccountRecord, events: &[EventLogEntry]) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.accounts.contains_key(&record.account_id) {
            return Err(AccountError::AlreadyExists { id: record.account_id.clone() }.into());
        }
        inner.accounts.insert(record.account_id.clone(), record.clone());
        inner.push_events(events);
        Ok(())
    }

    fn remove(&self, account_id: &str, events: &[EventLogEntry]) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.accounts.remove(account_id).is_none() {
            return Err(PoolError::not_found(account_id));
        }
        inner.push_events(events);
        Ok(())
    }

    fn append_event(&self, entry: &EventLogEntry) -> Result<()> {
        self.inner.write().push_events(std::slice::from_ref(entry));
        Ok(())
    }

    fn commit(&self, record: &AccountRecord, events: &[EventLogEntry]) -> Result<()> {
        let mut inner = self.inner.write();
        inner.accounts.insert(record.account_id.clone(), record.clone());
        inner.push_events(events);
        Ok(())
    }

    fn events(&self, query: &EventQuery) -> Result<Vec<EventLogEntry>> {
        let matching: Vec<EventLogEntry> =
            self.inner.read().events.iter().filter(|e| query.matches(e)).cloned().collect();
        Ok(keep_newest(matching, query.limit))
    }

    fn reset_daily_counters(&self, today: NaiveDate, now: DateTime<Utc>) -> Result<bool> {
        let mut inner = self.inner.write();
        if inner.last_daily_reset == Some(today) {
            return Ok(false);
        }
        for record in inner.accounts.values_mut() {
            reset_daily_budgets(record, now);
        }
        inner.last_daily_reset = Some(today);
        Ok(true)
    }
}
