//! Account model and related types.

use super::{HealthSignals, RateBudget};
use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Purpose an account serves in the pool.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    #[default]
    Main,
    Backup,
    Niche,
    Engagement,
    Monitoring,
}

impl AccountRole {
    pub const ALL: [Self; 5] =
        [Self::Main, Self::Backup, Self::Niche, Self::Engagement, Self::Monitoring];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Backup => "backup",
            Self::Niche => "niche",
            Self::Engagement => "engagement",
            Self::Monitoring => "monitoring",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::Invalid {
                field: "role".to_string(),
                message: format!("unknown role '{s}'"),
            })
    }
}

/// Per-account lifecycle state.
///
/// ```text
/// active ──429──▶ rate_limited ──window rollover──▶ active
/// active ──failure──▶ erroring ──N consecutive──▶ disabled
/// erroring ──success on an outstanding lease──▶ active
/// disabled ──operator reactivation──▶ active
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    RateLimited,
    Erroring,
    Disabled,
}

impl AccountStatus {
    pub const ALL: [Self; 4] = [Self::Active, Self::RateLimited, Self::Erroring, Self::Disabled];

    /// States the dispatcher may hand out leases for. An erroring account
    /// only settles the leases it already holds.
    pub const SELECTABLE: [Self; 2] = [Self::Active, Self::RateLimited];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::RateLimited => "rate_limited",
            Self::Erroring => "erroring",
            Self::Disabled => "disabled",
        }
    }

    pub const fn is_selectable(&self) -> bool {
        matches!(self, Self::Active | Self::RateLimited)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountStatus {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s) || st.as_str().replace('_', "-") == s)
            .ok_or_else(|| ConfigError::Invalid {
                field: "status".to_string(),
                message: format!("unknown status '{s}'"),
            })
    }
}

/// API credential set for one account. Opaque to the dispatcher.
///
/// `Debug` prints the masked form only.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Credentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_secret: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_secret: String,
    #[serde(default)]
    pub bearer_token: String,
}

/// Keep the first and last four characters; anything short is fully hidden.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

impl Credentials {
    pub fn masked(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("api_key", mask_secret(&self.api_key)),
            ("api_secret", mask_secret(&self.api_secret)),
            ("access_token", mask_secret(&self.access_token)),
            ("access_secret", mask_secret(&self.access_secret)),
            ("bearer_token", mask_secret(&self.bearer_token)),
        ])
    }

    /// Single masked value suitable for listings: bearer token, else API key.
    pub fn masked_primary(&self) -> String {
        if self.bearer_token.is_empty() {
            mask_secret(&self.api_key)
        } else {
            mask_secret(&self.bearer_token)
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.masked()).finish()
    }
}

/// Persisted state of one credentialed account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountRecord {
    /// Stable identifier, never changes after registration
    pub account_id: String,
    /// Public handle, informational only
    #[serde(default)]
    pub username: String,
    pub credentials: Credentials,
    #[serde(default)]
    pub role: AccountRole,
    #[serde(default)]
    pub status: AccountStatus,
    /// Derived fitness in [0, 100]; recomputed by the dispatcher only
    pub health_score: f64,
    #[serde(default)]
    pub signals: HealthSignals,
    /// Action type -> budget
    #[serde(default)]
    pub budgets: BTreeMap<String, RateBudget>,
    #[serde(default)]
    pub violation_count: u32,
    #[serde(default)]
    pub consecutive_failures: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
    /// Action whose window the upstream service exhausted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limited_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl AccountRecord {
    pub fn new(
        account_id: impl Into<String>,
        role: AccountRole,
        credentials: Credentials,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            username: String::new(),
            credentials,
            role,
            status: AccountStatus::Active,
            health_score: 0.0,
            signals: HealthSignals::default(),
            budgets: BTreeMap::new(),
            violation_count: 0,
            consecutive_failures: 0,
            tags: Vec::new(),
            notes: String::new(),
            disabled_reason: None,
            rate_limited_action: None,
            last_used_at: None,
            created_at: now,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budgets.insert(budget.action_type.clone(), budget);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Public view with the credential masked.
    pub fn summary(&self, fingerprint: String) -> AccountSummary {
        AccountSummary {
            account_id: self.account_id.clone(),
            username: self.username.clone(),
            role: self.role,
            status: self.status,
            health_score: self.health_score,
            masked_credential: self.credentials.masked_primary(),
            fingerprint,
            violation_count: self.violation_count,
            last_used_at: self.last_used_at,
            tags: self.tags.clone(),
        }
    }
}

/// What `list_accounts` hands to callers. Never contains raw secrets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountSummary {
    pub account_id: String,
    pub username: String,
    pub role: AccountRole,
    pub status: AccountStatus,
    pub health_score: f64,
    pub masked_credential: String,
    pub fingerprint: String,
    pub violation_count: u32,
    pub last_used_at: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

/// Selection criteria for `AccountStore::list`. Empty `statuses` means any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountFilter {
    pub role: Option<AccountRole>,
    pub statuses: Vec<AccountStatus>,
    pub tag: Option<String>,
}

impl AccountFilter {
    pub fn any() -> Self {
        Self::default()
    }

    /// Accounts the dispatcher may select, optionally restricted to a role.
    pub fn selectable(role: Option<AccountRole>) -> Self {
        Self { role, statuses: AccountStatus::SELECTABLE.to_vec(), tag: None }
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.statuses.push(status);
        self
    }

    pub fn matches(&self, record: &AccountRecord) -> bool {
        if let Some(role) = self.role {
            if record.role != role {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&record.status) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !record.has_tag(tag) {
                return false;
            }
        }
        true
    }
}
