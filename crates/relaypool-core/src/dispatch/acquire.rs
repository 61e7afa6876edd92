use relaypool_types::{
    AccountFilter, AccountRole, EventLogEntry, EventType, Lease, PoolError, Result,
};

use super::Dispatcher;

impl Dispatcher {
    /// Reserve one unit of `action_type` budget on the best eligible account.
    ///
    /// Candidates are scanned in fairness order (health desc, then least
    /// recently used) and the first successful reservation wins. Nothing is
    /// written when no candidate has headroom.
    pub fn acquire(&self, action_type: &str, role: Option<AccountRole>) -> Result<Lease> {
        let _maintenance = self.maintenance.read();
        let candidates = self.store.list(&AccountFilter::selectable(role))?;

        for candidate in candidates {
            let lock = self.account_lock(&candidate.account_id);
            let _guard = lock.lock();
            let now = self.clock.now();

            // The listed snapshot may be stale; decide on the locked copy.
            let mut record = match self.store.get(&candidate.account_id) {
                Ok(record) => record,
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            };
            if !record.status.is_selectable() {
                continue;
            }
            if !self.ensure_budget(&mut record, action_type, now) {
                continue;
            }

            let mut events = Vec::with_capacity(2);
            if let Some(recovered) = Self::recover_if_rolled(&mut record, now) {
                events.push(recovered);
            }
            let reserved = record
                .budgets
                .get_mut(action_type)
                .is_some_and(|budget| budget.try_reserve(now));
            if !reserved {
                continue;
            }

            record.last_used_at = Some(now);
            let lease = Lease {
                account_id: record.account_id.clone(),
                action_type: action_type.to_string(),
                issued_at: now,
                expires_at: self.lease_expiry(now),
                token: uuid::Uuid::new_v4().to_string(),
            };
            events.push(
                EventLogEntry::new(now, &record.account_id, EventType::Acquired)
                    .with_action(action_type),
            );
            self.store.commit(&record, &events)?;
            self.leases.insert(lease.token.clone(), lease.clone());

            tracing::debug!(
                account_id = %lease.account_id,
                action = action_type,
                health = record.health_score,
                "Lease issued"
            );
            return Ok(lease);
        }

        tracing::debug!(action = action_type, role = ?role, "Pool exhausted");
        Err(PoolError::ExhaustedPool {
            action: action_type.to_string(),
            role: role.map(|r| r.to_string()),
        })
    }
}
