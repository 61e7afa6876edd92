//! Account-related errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during account operations.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum AccountError {
    /// Account with given ID not found
    #[error("Account not found: {id}")]
    NotFound {
        /// Unique identifier of the missing account
        id: String,
    },

    /// Account ID is already registered
    #[error("Account already exists: {id}")]
    AlreadyExists {
        /// Identifier that collided
        id: String,
    },

    /// Account is disabled and needs operator reactivation
    #[error("Account {id} is disabled: {}", reason.as_deref().unwrap_or("no reason provided"))]
    Disabled {
        /// Unique identifier of the disabled account
        id: String,
        /// Optional explanation for why the account was disabled
        reason: Option<String>,
    },
}
