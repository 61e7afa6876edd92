//! Dispatcher configuration.

use super::{HealthWeights, MAX_WINDOW_SECS};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quota template applied when an account has no budget for an action yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetSpec {
    pub limit: u32,
    pub window_secs: i64,
}

impl BudgetSpec {
    pub const fn new(limit: u32, window_secs: i64) -> Self {
        Self { limit, window_secs }
    }
}

/// Tunables for the dispatch manager.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Consecutive failures before an account is disabled
    pub failure_threshold: u32,
    /// Seconds a lease stays reportable
    pub lease_ttl_secs: i64,
    /// Return the reserved unit when a lease expires unreported
    pub release_expired_leases: bool,
    pub health_weights: HealthWeights,
    /// Violations older than this no longer affect health
    pub violation_lookback_secs: i64,
    /// Multiplicative penalty of one fresh violation, in (0, 1]
    pub violation_penalty: f64,
    /// Added to the authenticity signal when a success ends a failure streak
    pub success_nudge: f64,
    /// Budgets created lazily per action type
    pub default_budgets: BTreeMap<String, BudgetSpec>,
    /// Interval of the background reconciliation task
    pub reconcile_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            lease_ttl_secs: 120,
            release_expired_leases: false,
            health_weights: HealthWeights::default(),
            violation_lookback_secs: 7 * 86_400,
            violation_penalty: 0.5,
            success_nudge: 0.02,
            default_budgets: default_budgets(),
            reconcile_interval_secs: 60,
        }
    }
}

/// Published per-user limits of the upstream API.
fn default_budgets() -> BTreeMap<String, BudgetSpec> {
    BTreeMap::from([
        ("tweet".to_string(), BudgetSpec::new(200, 900)),
        ("search".to_string(), BudgetSpec::new(180, 900)),
        ("like".to_string(), BudgetSpec::new(50, 900)),
        ("retweet".to_string(), BudgetSpec::new(50, 900)),
        ("follow".to_string(), BudgetSpec::new(400, 86_400)),
        ("dm".to_string(), BudgetSpec::new(500, 86_400)),
    ])
}

impl DispatchConfig {
    pub fn budget_for(&self, action_type: &str) -> Option<BudgetSpec> {
        self.default_budgets.get(action_type).copied()
    }

    /// Reject unusable values and normalize the health weights.
    pub fn validate(mut self) -> Result<Self, ConfigError> {
        fn invalid(field: &str, message: &str) -> ConfigError {
            ConfigError::Invalid { field: field.to_string(), message: message.to_string() }
        }

        if self.failure_threshold == 0 {
            return Err(invalid("failure_threshold", "must be at least 1"));
        }
        let in_range = |secs: i64| secs > 0 && secs <= MAX_WINDOW_SECS;
        if !in_range(self.lease_ttl_secs) {
            return Err(invalid("lease_ttl_secs", "must be positive and at most ten years"));
        }
        if !in_range(self.violation_lookback_secs) {
            return Err(invalid("violation_lookback_secs", "must be positive and at most ten years"));
        }
        if !(self.violation_penalty > 0.0 && self.violation_penalty <= 1.0) {
            return Err(invalid("violation_penalty", "must be in (0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.success_nudge) {
            return Err(invalid("success_nudge", "must be in [0, 1]"));
        }
        if !self.health_weights.is_valid() {
            return Err(invalid("health_weights", "weights must be non-negative with a positive sum"));
        }
        for (action, spec) in &self.default_budgets {
            if spec.limit == 0 || !in_range(spec.window_secs) {
                return Err(invalid(
                    &format!("default_budgets.{action}"),
                    "limit must be positive, window_secs positive and at most ten years",
                ));
            }
        }
        if self.reconcile_interval_secs == 0 || self.reconcile_interval_secs > MAX_WINDOW_SECS.unsigned_abs() {
            return Err(invalid("reconcile_interval_secs", "must be positive and at most ten years"));
        }
        self.health_weights = self.health_weights.normalized();
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DispatchConfig::default().validate().unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.budget_for("tweet"), Some(BudgetSpec::new(200, 900)));
        assert!(config.budget_for("teleport").is_none());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: DispatchConfig =
            serde_json::from_str(r#"{"failure_threshold": 5, "lease_ttl_secs": 30}"#).unwrap();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.lease_ttl_secs, 30);
        assert_eq!(config.default_budgets.len(), DispatchConfig::default().default_budgets.len());
    }

    #[test]
    fn test_zero_limit_budget_rejected() {
        let mut config = DispatchConfig::default();
        config.default_budgets.insert("dm".into(), BudgetSpec::new(0, 60));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_budgets.dm"));
    }

    #[test]
    fn test_unbounded_durations_rejected() {
        let config = DispatchConfig { lease_ttl_secs: i64::MAX, ..Default::default() };
        assert!(config.validate().unwrap_err().to_string().contains("lease_ttl_secs"));

        let config = DispatchConfig { violation_lookback_secs: MAX_WINDOW_SECS + 1, ..Default::default() };
        assert!(config.validate().is_err());

        let mut config = DispatchConfig::default();
        config.default_budgets.insert("tweet".into(), BudgetSpec::new(5, i64::MAX));
        assert!(config.validate().unwrap_err().to_string().contains("default_budgets.tweet"));

        let config = DispatchConfig { lease_ttl_secs: MAX_WINDOW_SECS, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_weights_are_normalized_on_validate() {
        let mut config = DispatchConfig::default();
        config.health_weights =
            HealthWeights { engagement: 1.0, growth: 1.0, violations: 1.0, authenticity: 1.0 };
        let config = config.validate().unwrap();
        assert!((config.health_weights.engagement - 0.25).abs() < 1e-9);
    }
}
