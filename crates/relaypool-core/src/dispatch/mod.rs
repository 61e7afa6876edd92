//! Multi-account dispatch manager.
//!
//! Callers `acquire` a lease for an action type, perform the external call,
//! then `report` the outcome. All account state lives in the injected
//! [`AccountStore`]; the dispatcher keeps only in-flight leases and locks.
//!
//! Locking:
//! - `maintenance` is taken shared by every public operation and exclusive by
//!   `reset_daily_counters`. Public operations never call each other, so the
//!   shared side is never taken recursively.
//! - one mutex per account serializes read -> reserve -> commit. It is never
//!   held across an await point and never nested with another account's.

mod acquire;
mod async_wrappers;
mod report;
mod service;

pub use service::DispatchService;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use relaypool_types::{
    AccountError, AccountFilter, AccountRecord, AccountStatus, AccountSummary, AggregateReport,
    ConfigError, DispatchConfig, EventLogEntry, EventType, Lease, PoolError, RateBudget,
    ReconcileSummary, Result, SignalUpdate,
};

use crate::aggregator;
use crate::clock::{Clock, SystemClock};
use crate::export::{self, ExportFormat};
use crate::health::HealthModel;
use crate::store::AccountStore;
use crate::utils::crypto::fingerprint;

pub struct Dispatcher {
    store: Arc<dyn AccountStore>,
    config: DispatchConfig,
    health: HealthModel,
    clock: Arc<dyn Clock>,
    /// token -> issued lease
    leases: DashMap<String, Lease>,
    account_locks: DashMap<String, Arc<Mutex<()>>>,
    maintenance: RwLock<()>,
}

impl Dispatcher {
    /// Validates `config` and uses the wall clock.
    pub fn new(store: Arc<dyn AccountStore>, config: DispatchConfig) -> Result<Self> {
        let config = config.validate()?;
        Ok(Self {
            store,
            health: HealthModel::from_config(&config),
            config,
            clock: Arc::new(SystemClock),
            leases: DashMap::new(),
            account_locks: DashMap::new(),
            maintenance: RwLock::new(()),
        })
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn AccountStore> {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[cfg(test)]
    pub(crate) fn tracked_locks(&self) -> usize {
        self.account_locks.len()
    }

    /// Leases issued and not yet reported, released or swept.
    pub fn outstanding_leases(&self) -> usize {
        self.leases.len()
    }

    fn account_lock(&self, account_id: &str) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(account_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Saturates at the end of representable time.
    fn lease_expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_seconds(self.config.lease_ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn rescore(&self, record: &mut AccountRecord, now: DateTime<Utc>) {
        self.health.prune(&mut record.signals, now);
        record.health_score = self.health.score(&record.signals, now);
    }

    /// Create the configured budget for `action_type` if the record has none.
    /// Returns false when the action type is unknown to both.
    fn ensure_budget(&self, record: &mut AccountRecord, action_type: &str, now: DateTime<Utc>) -> bool {
        if record.budgets.contains_key(action_type) {
            return true;
        }
        match self.config.budget_for(action_type) {
            Some(spec) => {
                record.budgets.insert(
                    action_type.to_string(),
                    RateBudget::new(action_type, spec.limit, spec.window_secs, now),
                );
                true
            },
            None => false,
        }
    }

    /// Restore a rate-limited account once the exhausted window has headroom.
    fn recover_if_rolled(record: &mut AccountRecord, now: DateTime<Utc>) -> Option<EventLogEntry> {
        if record.status != AccountStatus::RateLimited {
            return None;
        }
        let limited = record.rate_limited_action.clone();
        if let Some(action) = &limited {
            if let Some(budget) = record.budgets.get_mut(action) {
                budget.roll_if_expired(now);
                if budget.remaining(now) == 0 {
                    return None;
                }
            }
        }
        record.status = AccountStatus::Active;
        record.rate_limited_action = None;
        let mut entry = EventLogEntry::new(now, &record.account_id, EventType::Reactivated)
            .with_detail("window_rollover");
        entry.action_type = limited;
        Some(entry)
    }

    // ── Account lifecycle ───────────────────────────────────────────────

    /// Add an account to the pool. Its health score is computed here.
    pub fn register_account(&self, mut record: AccountRecord) -> Result<AccountSummary> {
        if record.account_id.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "account_id".to_string(),
                message: "must not be empty".to_string(),
            }
            .into());
        }
        Self::check_budgets(&mut record)?;
        let _maintenance = self.maintenance.read();
        let now = self.clock.now();
        self.rescore(&mut record, now);

        let event = EventLogEntry::new(now, &record.account_id, EventType::Registered)
            .with_detail(format!("role={}", record.role));
        self.store.insert(&record, &[event])?;

        let fp = fingerprint(&record.credentials);
        tracing::info!(
            account_id = %record.account_id,
            role = %record.role,
            fingerprint = %fp,
            "Registered account"
        );
        Ok(record.summary(fp))
    }

    /// Reject budgets that cannot be enforced and cap usage at the limit.
    fn check_budgets(record: &mut AccountRecord) -> Result<()> {
        for (key, budget) in &mut record.budgets {
            let problem = if *key != budget.action_type {
                Some("key does not match action_type")
            } else {
                budget.problem()
            };
            if let Some(message) = problem {
                return Err(ConfigError::Invalid {
                    field: format!("budgets.{key}"),
                    message: message.to_string(),
                }
                .into());
            }
            if budget.used_in_window > budget.limit {
                tracing::debug!(
                    account_id = %record.account_id,
                    action = %key,
                    used = budget.used_in_window,
                    limit = budget.limit,
                    "Imported usage capped at limit"
                );
                budget.used_in_window = budget.limit;
            }
        }
        Ok(())
    }

    /// Delete an account. Its history stays in the log and its leases die.
    pub fn remove_account(&self, account_id: &str) -> Result<()> {
        let _maintenance = self.maintenance.read();
        let lock = self.account_lock(account_id);
        let _guard = lock.lock();

        let event = EventLogEntry::new(self.clock.now(), account_id, EventType::Removed);
        self.store.remove(account_id, &[event])?;
        self.leases.retain(|_, lease| lease.account_id != account_id);
        // Keep the entry while another thread is queued on it
        self.account_locks.remove_if(account_id, |_, held| Arc::strong_count(held) <= 2);
        tracing::info!(account_id, "Removed account");
        Ok(())
    }

    /// Operator reactivation. The only way out of `disabled`.
    ///
    /// Returns false if the account was already active.
    pub fn reactivate(&self, account_id: &str) -> Result<bool> {
        let _maintenance = self.maintenance.read();
        let lock = self.account_lock(account_id);
        let _guard = lock.lock();

        let now = self.clock.now();
        let mut record = self.store.get(account_id)?;
        if record.status == AccountStatus::Active {
            return Ok(false);
        }
        let previous = record.status;
        record.status = AccountStatus::Active;
        record.consecutive_failures = 0;
        record.disabled_reason = None;
        record.rate_limited_action = None;
        self.rescore(&mut record, now);

        let event = EventLogEntry::new(now, account_id, EventType::Reactivated)
            .with_detail(format!("manual (was {previous})"));
        self.store.commit(&record, &[event])?;
        tracing::info!(account_id, from = %previous, "Account reactivated");
        Ok(true)
    }

    /// Operator quarantine. Fails with `Disabled` if already disabled.
    pub fn disable(&self, account_id: &str, reason: &str) -> Result<()> {
        let _maintenance = self.maintenance.read();
        let lock = self.account_lock(account_id);
        let _guard = lock.lock();

        let mut record = self.store.get(account_id)?;
        if record.status == AccountStatus::Disabled {
            return Err(AccountError::Disabled {
                id: account_id.to_string(),
                reason: record.disabled_reason,
            }
            .into());
        }
        record.status = AccountStatus::Disabled;
        record.disabled_reason = Some(reason.to_string());

        let event = EventLogEntry::new(self.clock.now(), account_id, EventType::Disabled)
            .with_detail(format!("manual: {reason}"));
        self.store.commit(&record, &[event])?;
        tracing::warn!(account_id, reason, "Account disabled by operator");
        Ok(())
    }

    /// Record fresh analytics signals and return the new health score.
    pub fn update_signals(&self, account_id: &str, update: SignalUpdate) -> Result<f64> {
        let _maintenance = self.maintenance.read();
        let lock = self.account_lock(account_id);
        let _guard = lock.lock();

        let mut record = self.store.get(account_id)?;
        update.apply(&mut record.signals);
        self.rescore(&mut record, self.clock.now());
        self.store.save(&record)?;
        tracing::debug!(account_id, health = record.health_score, "Signals updated");
        Ok(record.health_score)
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Public listing. Credentials appear masked only.
    pub fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<AccountSummary>> {
        Ok(self
            .store
            .list(filter)?
            .into_iter()
            .map(|r| {
                let fp = fingerprint(&r.credentials);
                r.summary(fp)
            })
            .collect())
    }

    pub fn get_account(&self, account_id: &str) -> Result<AccountSummary> {
        let record = self.store.get(account_id)?;
        let fp = fingerprint(&record.credentials);
        Ok(record.summary(fp))
    }

    /// Remaining units per action type for one account at the current time.
    pub fn headroom(&self, account_id: &str) -> Result<Vec<(String, u32, u32)>> {
        let now = self.clock.now();
        let record = self.store.get(account_id)?;
        Ok(record
            .budgets
            .values()
            .map(|b| (b.action_type.clone(), b.remaining(now), b.limit))
            .collect())
    }

    pub fn aggregate(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<AggregateReport> {
        aggregator::compute(self.store.as_ref(), from, to)
    }

    /// Serialize the aggregate over `[from, to)`.
    pub fn export(&self, format: ExportFormat, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<String> {
        let report = self.aggregate(from, to)?;
        Ok(export::render(&report, format)?)
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    /// Zero every daily budget. Blocks acquisitions for the duration.
    pub fn reset_daily_counters(&self) -> Result<bool> {
        let _exclusive = self.maintenance.write();
        let now = self.clock.now();
        let reset = self.store.reset_daily_counters(now.date_naive(), now)?;
        if reset {
            tracing::info!(day = %now.date_naive(), "Daily counters reset");
        } else {
            tracing::debug!(day = %now.date_naive(), "Daily counters already reset");
        }
        Ok(reset)
    }

    /// Drop leases past their TTL. Returns how many were dropped.
    ///
    /// With `release_expired_leases`, a lease whose rollback cannot be
    /// written stays tracked for the next pass and the first such error is
    /// returned after the remaining leases are handled.
    pub fn sweep_expired_leases(&self) -> Result<usize> {
        let _maintenance = self.maintenance.read();
        self.sweep_expired(self.clock.now())
    }

    fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired: Vec<String> = self
            .leases
            .iter()
            .filter(|entry| entry.value().is_expired(now))
            .map(|entry| entry.key().clone())
            .collect();

        let mut dropped = 0;
        let mut failure = None;
        for token in expired {
            let Some((_, lease)) = self.leases.remove_if(&token, |_, l| l.is_expired(now)) else {
                continue;
            };
            if self.config.release_expired_leases {
                if let Err(e) = self.roll_back_expired(&lease, now) {
                    tracing::warn!(account_id = %lease.account_id, "Expired lease rollback deferred: {}", e);
                    if failure.is_none() {
                        failure = Some(e);
                    }
                    continue;
                }
            }
            dropped += 1;
        }
        if dropped > 0 {
            tracing::debug!(dropped, "Expired leases swept");
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(dropped),
        }
    }

    /// Return the unit of an expired lease. A lease whose rollback could not
    /// be persisted is tracked again so the rollback is retried.
    fn roll_back_expired(&self, lease: &Lease, now: DateTime<Utc>) -> Result<()> {
        let lock = self.account_lock(&lease.account_id);
        let _guard = lock.lock();
        match self.give_back(lease, now, "lease_expired") {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => {
                if matches!(e, PoolError::PersistenceFailure(_)) {
                    self.leases.insert(lease.token.clone(), lease.clone());
                }
                Err(e)
            },
        }
    }

    /// Rescore every account, restore rate-limited accounts whose window
    /// rolled over and sweep expired leases.
    pub fn reconcile(&self) -> Result<ReconcileSummary> {
        let _maintenance = self.maintenance.read();
        let now = self.clock.now();
        let mut summary =
            ReconcileSummary { expired_leases: self.sweep_expired(now)?, ..Default::default() };

        for candidate in self.store.list(&AccountFilter::any())? {
            let lock = self.account_lock(&candidate.account_id);
            let _guard = lock.lock();

            let mut record = match self.store.get(&candidate.account_id) {
                Ok(record) => record,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            let before = record.clone();
            let mut events = Vec::new();
            if let Some(event) = Self::recover_if_rolled(&mut record, now) {
                summary.recovered += 1;
                events.push(event);
            }
            self.rescore(&mut record, now);
            if (record.health_score - before.health_score).abs() > f64::EPSILON {
                summary.rescored += 1;
            }
            if record != before {
                self.store.commit(&record, &events)?;
            }
        }
        Ok(summary)
    }

    /// Run `reconcile` and the daily reset on a tokio interval.
    pub fn start_auto_reconcile(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let dispatcher = Arc::clone(self);
        let period = std::time::Duration::from_secs(self.config.reconcile_interval_secs);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                match dispatcher.reconcile_async().await {
                    Ok(summary) if summary.recovered > 0 || summary.expired_leases > 0 => {
                        tracing::info!(
                            recovered = summary.recovered,
                            rescored = summary.rescored,
                            expired_leases = summary.expired_leases,
                            "🧹 Reconcile pass"
                        );
                    },
                    Ok(_) => {},
                    Err(e) => tracing::warn!("⚠️ Reconcile failed: {}", e),
                }
                if let Err(e) = dispatcher.reset_daily_counters_async().await {
                    tracing::warn!("⚠️ Daily reset failed: {}", e);
                }
            }
        });
        tracing::info!(
            "✅ Auto-reconcile task started (interval: {}s)",
            self.config.reconcile_interval_secs
        );
        handle
    }
}

#[cfg(test)]
mod tests;
