//! Append-only account event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Registered,
    Acquired,
    Succeeded,
    Failed,
    RateLimited,
    Disabled,
    Reactivated,
    Released,
    Removed,
}

impl EventType {
    pub const ALL: [Self; 9] = [
        Self::Registered,
        Self::Acquired,
        Self::Succeeded,
        Self::Failed,
        Self::RateLimited,
        Self::Disabled,
        Self::Reactivated,
        Self::Released,
        Self::Removed,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Acquired => "acquired",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::RateLimited => "rate_limited",
            Self::Disabled => "disabled",
            Self::Reactivated => "reactivated",
            Self::Released => "released",
            Self::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }
}

/// One immutable line of account history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EventLogEntry {
    pub timestamp: DateTime<Utc>,
    pub account_id: String,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
    #[serde(default)]
    pub detail: String,
}

impl EventLogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        account_id: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            timestamp,
            account_id: account_id.into(),
            event_type,
            action_type: None,
            detail: String::new(),
        }
    }

    pub fn with_action(mut self, action_type: impl Into<String>) -> Self {
        self.action_type = Some(action_type.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Time-bounded, optionally per-account scan of the event log.
///
/// `since` is inclusive, `until` exclusive. `limit` keeps the newest N
/// entries. Results come back oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventQuery {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub account_id: Option<String>,
    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn window(since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        Self { since: Some(since), until: Some(until), ..Default::default() }
    }

    pub fn for_account(account_id: impl Into<String>) -> Self {
        Self { account_id: Some(account_id.into()), ..Default::default() }
    }

    pub fn matches(&self, entry: &EventLogEntry) -> bool {
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp >= until {
                return false;
            }
        }
        match &self.account_id {
            Some(id) => &entry.account_id == id,
            None => true,
        }
    }
}
