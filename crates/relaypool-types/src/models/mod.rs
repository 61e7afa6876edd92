//! Core domain models for relaypool.

mod account;
mod budget;
mod config;
mod event;
mod health;
mod lease;
mod stats;

pub use account::{
    mask_secret, AccountFilter, AccountRecord, AccountRole, AccountStatus, AccountSummary,
    Credentials,
};
pub use budget::{RateBudget, DAILY_WINDOW_SECS, MAX_WINDOW_SECS};
pub use config::{BudgetSpec, DispatchConfig};
pub use event::{EventLogEntry, EventQuery, EventType};
pub use health::{HealthSignals, HealthWeights, SignalUpdate};
pub use lease::{Lease, Outcome};
pub use stats::{AccountScore, AggregateReport, OutcomeTotals, PoolSummary, ReconcileSummary};
