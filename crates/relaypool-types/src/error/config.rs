//! Configuration errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or validating `DispatchConfig`.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum ConfigError {
    /// A field holds a value the dispatcher cannot work with
    #[error("Invalid value for {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field
        field: String,
        /// Why it was rejected
        message: String,
    },

    /// Config file could not be read or written
    #[error("Config file error: {message}")]
    Io { message: String },
}
