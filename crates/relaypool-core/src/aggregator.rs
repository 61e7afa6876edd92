//! Read-only cross-account analytics.
//!
//! Every call rescans the event log and the current records. Nothing is
//! cached.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use relaypool_types::{
    AccountFilter, AccountRecord, AccountRole, AccountScore, AccountStatus, AggregateReport,
    EventLogEntry, EventQuery, EventType, OutcomeTotals, PoolSummary, Result,
};

use crate::store::AccountStore;

/// Build the report for events in `[from, to)` plus a snapshot of the pool.
pub fn compute(
    store: &dyn AccountStore,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<AggregateReport> {
    let events = store.events(&EventQuery::window(from, to))?;
    let records = store.list(&AccountFilter::any())?;

    let (usage_by_action, outcomes) = tally(&events);
    let reported = outcomes.reported();
    let success_rate =
        if reported == 0 { 0.0 } else { outcomes.succeeded as f64 / reported as f64 };

    Ok(AggregateReport {
        window_start: from,
        window_end: to,
        usage_by_action,
        outcomes,
        success_rate,
        avg_health_by_role: avg_health_by_role(&records),
        pool: pool_summary(&records),
    })
}

fn tally(events: &[EventLogEntry]) -> (BTreeMap<String, u64>, OutcomeTotals) {
    let mut usage = BTreeMap::new();
    let mut totals = OutcomeTotals::default();
    for event in events {
        match event.event_type {
            EventType::Acquired => {
                totals.acquired += 1;
                if let Some(action) = &event.action_type {
                    *usage.entry(action.clone()).or_insert(0) += 1;
                }
            },
            EventType::Succeeded => totals.succeeded += 1,
            EventType::Failed => totals.failed += 1,
            EventType::RateLimited => totals.rate_limited += 1,
            EventType::Released => totals.released += 1,
            EventType::Disabled => {
                totals.disabled += 1;
                // The failure that trips the threshold is logged as `disabled`
                // with the action attached; operator disables carry none.
                if event.action_type.is_some() {
                    totals.failed += 1;
                }
            },
            EventType::Reactivated => totals.reactivated += 1,
            EventType::Registered | EventType::Removed => {},
        }
    }
    (usage, totals)
}

fn avg_health_by_role(records: &[AccountRecord]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<AccountRole, (f64, u32)> = BTreeMap::new();
    for record in records {
        let entry = sums.entry(record.role).or_insert((0.0, 0));
        entry.0 += record.health_score;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(role, (sum, count))| (role.to_string(), sum / f64::from(count)))
        .collect()
}

fn pool_summary(records: &[AccountRecord]) -> PoolSummary {
    let mut by_status: BTreeMap<String, u64> =
        AccountStatus::ALL.iter().map(|s| (s.to_string(), 0)).collect();
    let mut by_role: BTreeMap<String, u64> =
        AccountRole::ALL.iter().map(|r| (r.to_string(), 0)).collect();

    for record in records {
        *by_status.entry(record.status.to_string()).or_insert(0) += 1;
        *by_role.entry(record.role.to_string()).or_insert(0) += 1;
    }

    let total = records.len() as u64;
    let avg_health = if records.is_empty() {
        0.0
    } else {
        records.iter().map(|r| r.health_score).sum::<f64>() / records.len() as f64
    };

    // Records arrive in fairness order: healthiest first
    let score = |r: &AccountRecord| AccountScore {
        account_id: r.account_id.clone(),
        health_score: r.health_score,
    };

    PoolSummary {
        total_accounts: total,
        available: records.iter().filter(|r| r.status.is_selectable()).count() as u64,
        by_status,
        by_role,
        avg_health,
        best: records.first().map(score),
        worst: records.last().map(score),
    }
}
