use chrono::{DateTime, Utc};
use relaypool_types::{
    AccountRecord, AccountStatus, EventLogEntry, EventType, Lease, LeaseError, Outcome, PoolError,
    Result,
};

use super::Dispatcher;

impl Dispatcher {
    /// Consume `lease` and apply the outcome of the external call.
    ///
    /// A lease is accepted once. If the write fails the lease is put back so
    /// the caller may report again.
    pub fn report(&self, lease: &Lease, outcome: Outcome) -> Result<()> {
        let _maintenance = self.maintenance.read();
        let now = self.clock.now();
        let issued = self.take_lease(lease, now)?;

        let lock = self.account_lock(&issued.account_id);
        let _guard = lock.lock();
        let result = self.apply_outcome(&issued, outcome, now);
        if let Err(PoolError::PersistenceFailure(_)) = &result {
            self.leases.insert(issued.token.clone(), issued);
        }
        result
    }

    /// Give the reserved unit back. For leases whose external call was never
    /// attempted.
    pub fn release(&self, lease: &Lease) -> Result<()> {
        let _maintenance = self.maintenance.read();
        let now = self.clock.now();
        let issued = self.take_lease(lease, now)?;

        let lock = self.account_lock(&issued.account_id);
        let _guard = lock.lock();
        let result = self.give_back(&issued, now, "caller");
        if let Err(PoolError::PersistenceFailure(_)) = &result {
            self.leases.insert(issued.token.clone(), issued);
        }
        result
    }

    /// Remove and return the issued lease matching `presented`.
    ///
    /// A mismatching lease leaves the issued one in place. An expired lease
    /// is consumed and rejected.
    fn take_lease(&self, presented: &Lease, now: DateTime<Utc>) -> Result<Lease> {
        let token = presented.token.clone();
        let removed = self.leases.remove_if(&presented.token, |_, issued| {
            issued.account_id == presented.account_id && issued.action_type == presented.action_type
        });
        let Some((_, issued)) = removed else {
            if self.leases.contains_key(&presented.token) {
                tracing::warn!(token = %presented.token, "Lease does not match issued lease");
                return Err(LeaseError::Mismatch { token }.into());
            }
            return Err(LeaseError::Unknown { token }.into());
        };

        if issued.is_expired(now) {
            tracing::debug!(account_id = %issued.account_id, token = %issued.token, "Expired lease presented");
            if self.config.release_expired_leases {
                self.roll_back_expired(&issued, now)?;
            }
            return Err(LeaseError::Expired { token }.into());
        }
        Ok(issued)
    }

    /// Caller holds the account lock.
    pub(super) fn give_back(&self, lease: &Lease, now: DateTime<Utc>, detail: &str) -> Result<()> {
        let mut record = self.store.get(&lease.account_id)?;
        if let Some(budget) = record.budgets.get_mut(&lease.action_type) {
            budget.release(now);
        }
        let event = EventLogEntry::new(now, &lease.account_id, EventType::Released)
            .with_action(&lease.action_type)
            .with_detail(detail);
        self.store.commit(&record, &[event])?;
        tracing::debug!(account_id = %lease.account_id, action = %lease.action_type, detail, "Reservation released");
        Ok(())
    }

    /// Caller holds the account lock.
    fn apply_outcome(&self, lease: &Lease, outcome: Outcome, now: DateTime<Utc>) -> Result<()> {
        let mut record = self.store.get(&lease.account_id)?;
        let event = match outcome {
            Outcome::Success => self.on_success(&mut record, lease, now),
            Outcome::Failure => self.on_failure(&mut record, lease, now),
            Outcome::RateLimited => Self::on_rate_limited(&mut record, lease, now),
        };
        self.rescore(&mut record, now);
        self.store.commit(&record, &[event])?;
        Ok(())
    }

    fn on_success(&self, record: &mut AccountRecord, lease: &Lease, now: DateTime<Utc>) -> EventLogEntry {
        // Only a success that ends a failure streak moves health, otherwise
        // routine successes would reorder equally healthy accounts.
        if record.consecutive_failures > 0 {
            record.signals.authenticity =
                (record.signals.authenticity + self.config.success_nudge).min(1.0);
        }
        record.consecutive_failures = 0;
        if record.status == AccountStatus::Erroring {
            record.status = AccountStatus::Active;
            tracing::info!(account_id = %record.account_id, "Account recovered from erroring");
        }
        EventLogEntry::new(now, &record.account_id, EventType::Succeeded).with_action(&lease.action_type)
    }

    fn on_failure(&self, record: &mut AccountRecord, lease: &Lease, now: DateTime<Utc>) -> EventLogEntry {
        record.consecutive_failures += 1;
        record.violation_count += 1;
        record.signals.violations.push(now);

        let streak = record.consecutive_failures;
        if streak >= self.config.failure_threshold && record.status != AccountStatus::Disabled {
            let reason = format!("{streak} consecutive failures");
            tracing::warn!(account_id = %record.account_id, streak, "Account disabled after repeated failures");
            record.status = AccountStatus::Disabled;
            record.disabled_reason = Some(reason.clone());
            return EventLogEntry::new(now, &record.account_id, EventType::Disabled)
                .with_action(&lease.action_type)
                .with_detail(reason);
        }
        if record.status == AccountStatus::Active {
            record.status = AccountStatus::Erroring;
        }
        tracing::debug!(account_id = %record.account_id, streak, "Failure recorded");
        EventLogEntry::new(now, &record.account_id, EventType::Failed)
            .with_action(&lease.action_type)
            .with_detail(format!("consecutive_failures={streak}"))
    }

    /// The upstream 429 overrides the local estimate. Not a violation.
    fn on_rate_limited(record: &mut AccountRecord, lease: &Lease, now: DateTime<Utc>) -> EventLogEntry {
        if let Some(budget) = record.budgets.get_mut(&lease.action_type) {
            budget.force_exhaust(now);
        }
        if record.status != AccountStatus::Disabled {
            record.status = AccountStatus::RateLimited;
            record.rate_limited_action = Some(lease.action_type.clone());
        }
        tracing::info!(account_id = %record.account_id, action = %lease.action_type, "Account rate limited upstream");
        EventLogEntry::new(now, &record.account_id, EventType::RateLimited).with_action(&lease.action_type)
    }
}
