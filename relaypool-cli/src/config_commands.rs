use anyhow::Result;
use colored::Colorize;

use relaypool_core::modules::config as core_config;
use relaypool_types::{BudgetSpec, DispatchConfig};

/// A parsed `config set` assignment.
enum Setting {
    FailureThreshold(u32),
    LeaseTtl(i64),
    ReleaseExpired(bool),
    ViolationLookback(i64),
    ViolationPenalty(f64),
    SuccessNudge(f64),
    ReconcileInterval(u64),
    Weight(&'static str, f64),
    Budget(String, BudgetSpec),
}

impl Setting {
    fn parse(key: &str, value: &str) -> Result<Self> {
        fn num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value.trim().parse::<T>().map_err(|_| anyhow::anyhow!("Invalid value for {}: {}", key, value))
        }

        let setting = match key {
            "failure_threshold" => Self::FailureThreshold(num(key, value)?),
            "lease_ttl_secs" => Self::LeaseTtl(num(key, value)?),
            "release_expired_leases" => Self::ReleaseExpired(num(key, value)?),
            "violation_lookback_secs" => Self::ViolationLookback(num(key, value)?),
            "violation_penalty" => Self::ViolationPenalty(num(key, value)?),
            "success_nudge" => Self::SuccessNudge(num(key, value)?),
            "reconcile_interval_secs" => Self::ReconcileInterval(num(key, value)?),
            "health_weights.engagement" => Self::Weight("engagement", num(key, value)?),
            "health_weights.growth" => Self::Weight("growth", num(key, value)?),
            "health_weights.violations" => Self::Weight("violations", num(key, value)?),
            "health_weights.authenticity" => Self::Weight("authenticity", num(key, value)?),
            _ => match key.strip_prefix("budget.") {
                Some(action) if !action.is_empty() => {
                    let (limit, window) = value
                        .split_once('/')
                        .ok_or_else(|| anyhow::anyhow!("Budget must be 'limit/window_secs', got {}", value))?;
                    Self::Budget(
                        action.to_string(),
                        BudgetSpec::new(num(key, limit)?, num(key, window)?),
                    )
                },
                _ => anyhow::bail!("Unknown config key: {}", key),
            },
        };
        Ok(setting)
    }

    fn apply(self, config: &mut DispatchConfig) {
        match self {
            Self::FailureThreshold(v) => config.failure_threshold = v,
            Self::LeaseTtl(v) => config.lease_ttl_secs = v,
            Self::ReleaseExpired(v) => config.release_expired_leases = v,
            Self::ViolationLookback(v) => config.violation_lookback_secs = v,
            Self::ViolationPenalty(v) => config.violation_penalty = v,
            Self::SuccessNudge(v) => config.success_nudge = v,
            Self::ReconcileInterval(v) => config.reconcile_interval_secs = v,
            Self::Weight(name, v) => {
                let w = &mut config.health_weights;
                match name {
                    "engagement" => w.engagement = v,
                    "growth" => w.growth = v,
                    "violations" => w.violations = v,
                    _ => w.authenticity = v,
                }
            },
            Self::Budget(action, spec) => {
                config.default_budgets.insert(action, spec);
            },
        }
    }
}

pub fn show_config(json: bool) -> Result<()> {
    let config = core_config::load_config().map_err(|e| anyhow::anyhow!(e))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    println!("{}", "Dispatch Configuration:".cyan().bold());
    println!("  Failure threshold: {}", config.failure_threshold);
    println!("  Lease TTL: {}s", config.lease_ttl_secs);
    println!("  Release expired leases: {}", config.release_expired_leases);
    println!(
        "  Violations: penalty {} over {}s",
        config.violation_penalty, config.violation_lookback_secs
    );
    println!("  Success nudge: {}", config.success_nudge);
    println!("  Reconcile interval: {}s", config.reconcile_interval_secs);

    let w = &config.health_weights;
    println!(
        "  Health weights: engagement {:.2}, growth {:.2}, violations {:.2}, authenticity {:.2}",
        w.engagement, w.growth, w.violations, w.authenticity
    );

    println!("{}", "Default Budgets:".cyan().bold());
    for (action, spec) in &config.default_budgets {
        println!("  {:<10} {}/{}s", action, spec.limit, spec.window_secs);
    }
    Ok(())
}

pub fn get_config_value(key: &str) -> Result<()> {
    let config = core_config::load_config().map_err(|e| anyhow::anyhow!(e))?;
    let w = &config.health_weights;

    let value = match key {
        "failure_threshold" => config.failure_threshold.to_string(),
        "lease_ttl_secs" => config.lease_ttl_secs.to_string(),
        "release_expired_leases" => config.release_expired_leases.to_string(),
        "violation_lookback_secs" => config.violation_lookback_secs.to_string(),
        "violation_penalty" => config.violation_penalty.to_string(),
        "success_nudge" => config.success_nudge.to_string(),
        "reconcile_interval_secs" => config.reconcile_interval_secs.to_string(),
        "health_weights.engagement" => w.engagement.to_string(),
        "health_weights.growth" => w.growth.to_string(),
        "health_weights.violations" => w.violations.to_string(),
        "health_weights.authenticity" => w.authenticity.to_string(),
        _ => match key.strip_prefix("budget.").and_then(|action| config.budget_for(action)) {
            Some(spec) => format!("{}/{}", spec.limit, spec.window_secs),
            None => anyhow::bail!("Unknown config key: {}", key),
        },
    };

    println!("{}", value);
    Ok(())
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let setting = Setting::parse(key, value)?;

    core_config::update_config(|config| setting.apply(config)).map_err(|e| anyhow::anyhow!(e))?;

    println!("{} Config updated: {} = {}", "✓".green(), key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_setting_parses_limit_and_window() {
        let mut config = DispatchConfig::default();
        Setting::parse("budget.bookmark", "30/900").unwrap().apply(&mut config);
        assert_eq!(config.budget_for("bookmark"), Some(BudgetSpec::new(30, 900)));
    }

    #[test]
    fn test_bad_values_rejected_before_saving() {
        assert!(Setting::parse("failure_threshold", "three").is_err());
        assert!(Setting::parse("budget.tweet", "200").is_err());
        assert!(Setting::parse("budget.", "1/1").is_err());
        assert!(Setting::parse("proxy.port", "8080").is_err());
    }

    #[test]
    fn test_weight_setting_targets_named_weight() {
        let mut config = DispatchConfig::default();
        Setting::parse("health_weights.growth", "0.5").unwrap().apply(&mut config);
        assert!((config.health_weights.growth - 0.5).abs() < f64::EPSILON);
        assert!((config.health_weights.engagement - 0.35).abs() < f64::EPSILON);
    }
}
