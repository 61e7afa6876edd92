//! # relaypool Types
//!
//! Core types, models, and error definitions for the relaypool dispatch manager.
//!
//! - **`error`** - Typed error hierarchy for accounts, leases, storage and configuration
//! - **`models`** - Domain models (AccountRecord, RateBudget, Lease, EventLogEntry, config)
//!
//! ## Architecture Role
//!
//! `relaypool-types` sits at the bottom of the dependency graph:
//!
//! ```text
//!          relaypool-types (this crate)
//!                  │
//!                  ▼
//!           relaypool-core
//!                  │
//!                  ▼
//!           relaypool-cli
//! ```
//!
//! All types are serializable via serde and cheap to clone across threads.

pub mod error;
pub mod models;

pub use error::{AccountError, ConfigError, LeaseError, PoolError, Result, StoreError};

pub use models::{
    mask_secret, AccountFilter, AccountRecord, AccountRole, AccountScore, AccountStatus,
    AccountSummary, AggregateReport, BudgetSpec, Credentials, DispatchConfig, EventLogEntry,
    EventQuery, EventType, HealthSignals, HealthWeights, Lease, Outcome, OutcomeTotals,
    PoolSummary, RateBudget, ReconcileSummary, SignalUpdate, DAILY_WINDOW_SECS,
    MAX_WINDOW_SECS,
};
