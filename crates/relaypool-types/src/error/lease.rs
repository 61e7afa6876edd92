//! Lease protocol errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Ways a lease can be rejected by `report` or `release`.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum LeaseError {
    /// Token was never issued, or was already consumed
    #[error("lease {token} is unknown or already consumed")]
    Unknown { token: String },

    /// Lease outlived its TTL
    #[error("lease {token} expired")]
    Expired { token: String },

    /// Token exists but the presented lease carries different account/action
    #[error("lease {token} does not match the issued lease")]
    Mismatch { token: String },
}
