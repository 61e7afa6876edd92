//! Typed error definitions for relaypool.
//!
//! Every error is serializable (so the CLI can emit it as JSON), displayable
//! for logging and matchable by callers deciding whether to back off.

mod account;
mod config;
mod lease;
mod store;

pub use account::AccountError;
pub use config::ConfigError;
pub use lease::LeaseError;
pub use store::StoreError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Boundary error returned by the dispatch manager.
///
/// `ExhaustedPool` is the only expected, recoverable outcome. Everything else
/// is either a caller bug (`NotFound`, `InvalidLease`) or fatal to the
/// current operation (`PersistenceFailure`).
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "error")]
pub enum PoolError {
    /// Unknown or duplicate account.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// No eligible account has budget headroom for the requested action.
    #[error("No account has headroom for action '{action}'{}", role.as_deref().map(|r| format!(" (role {r})")).unwrap_or_default())]
    ExhaustedPool {
        /// Requested action type
        action: String,
        /// Role filter that was applied, if any
        role: Option<String>,
    },

    /// Lease replay, expiry or forgery.
    #[error("Invalid lease: {0}")]
    InvalidLease(#[from] LeaseError),

    /// Store unavailable; the operation was aborted without partial writes.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(#[from] StoreError),

    /// Configuration rejected.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl PoolError {
    /// Check whether the caller may retry later (back off or widen the filter).
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ExhaustedPool { .. })
    }

    /// Shorthand for `AccountError::NotFound`.
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::Account(AccountError::NotFound { id: id.into() })
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Account(AccountError::NotFound { .. }))
    }

    pub const fn is_invalid_lease(&self) -> bool {
        matches!(self, Self::InvalidLease(_))
    }
}

/// Standard Result type using PoolError.
pub type Result<T> = std::result::Result<T, PoolError>;
