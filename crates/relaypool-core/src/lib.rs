//! # Relaypool Core
//!
//! Dispatch manager for a pool of credentialed accounts calling a
//! rate-limited social API.
//!
//! ```text
//! relaypool-core/src/
//! ├── dispatch/      # Dispatcher: acquire/report, leases, locks, reconcile
//! ├── store/         # AccountStore trait, MemoryStore, SqliteStore
//! ├── health.rs      # HealthModel: weighted 0-100 score
//! ├── aggregator.rs  # Cross-account analytics over the event log
//! ├── export.rs      # json / csv / text rendering of the aggregate
//! ├── clock.rs       # Injected time source
//! └── modules/       # config file, logger, data paths
//! ```
//!
//! Budgets and records are owned by the store. A crash loses in-flight
//! leases only.

#![allow(
    clippy::significant_drop_tightening,
    reason = "Account guards cover the whole read-reserve-commit step"
)]
#![allow(
    clippy::redundant_else,
    reason = "Explicit else blocks improve readability in complex control flow"
)]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
#![allow(
    clippy::derive_partial_eq_without_eq,
    reason = "Some types intentionally don't implement Eq"
)]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::float_cmp,
        clippy::unwrap_used,
        clippy::assertions_on_result_states
    )
)]

pub mod aggregator;
pub mod clock;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod health;
pub mod modules;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use dispatch::{DispatchService, Dispatcher};
pub use error::{AppError, AppResult};
pub use export::ExportFormat;
pub use health::{grade, HealthModel};
pub use store::{AccountStore, MemoryStore, SqliteStore};
