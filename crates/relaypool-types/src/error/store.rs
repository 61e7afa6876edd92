//! Storage errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures of the durable account store.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum StoreError {
    /// Backend unavailable or a statement failed
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A persisted row could not be encoded or decoded
    #[error("serialization error: {message}")]
    Serialization { message: String },
}
