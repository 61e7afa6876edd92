//! Process-level plumbing: data directory, config file, logging.

pub mod config;
pub mod logger;
pub mod paths;
