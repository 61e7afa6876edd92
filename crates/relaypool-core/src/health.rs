//! Account health scoring.
//!
//! `score = 100 * Σ weight_i * signal_i` over four signals normalized to
//! [0, 1]. The violation signal is a product of per-violation penalties that
//! fade linearly to nothing over the lookback window, so one incident never
//! blacklists an account forever.

use chrono::{DateTime, Duration, Utc};
use relaypool_types::{DispatchConfig, HealthSignals, HealthWeights};

/// Engagement rate at which the engagement signal saturates (4%).
pub const ENGAGEMENT_SATURATION: f64 = 0.04;
/// Weekly follower gain that maps to a full growth signal.
pub const GROWTH_GAIN_SATURATION: f64 = 100.0;
/// Weekly follower loss that maps to a zero growth signal.
pub const GROWTH_LOSS_SATURATION: f64 = 75.0;

#[derive(Debug, Clone, Copy)]
pub struct HealthModel {
    weights: HealthWeights,
    lookback: Duration,
    penalty: f64,
}

impl HealthModel {
    pub fn new(weights: HealthWeights, lookback: Duration, penalty: f64) -> Self {
        Self { weights: weights.normalized(), lookback, penalty: penalty.clamp(0.0, 1.0) }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(
            config.health_weights,
            Duration::try_seconds(config.violation_lookback_secs).unwrap_or(Duration::MAX),
            config.violation_penalty,
        )
    }

    pub fn engagement_signal(rate: f64) -> f64 {
        if !rate.is_finite() || rate <= 0.0 {
            return 0.0;
        }
        (rate / ENGAGEMENT_SATURATION).min(1.0)
    }

    /// Zero growth is neutral (0.5).
    pub fn growth_signal(growth_7d: i64) -> f64 {
        let growth = growth_7d as f64;
        if growth >= 0.0 {
            0.5 + 0.5 * (growth / GROWTH_GAIN_SATURATION).min(1.0)
        } else {
            0.5 - 0.5 * (growth.abs() / GROWTH_LOSS_SATURATION).min(1.0)
        }
    }

    fn unit(value: f64) -> f64 {
        if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    /// How much of a violation's penalty is still in force at `now`.
    fn decay(&self, at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
        let lookback = self.lookback.num_milliseconds();
        if lookback <= 0 {
            return 0.0;
        }
        let age = (now - at).num_milliseconds().max(0);
        (1.0 - age as f64 / lookback as f64).max(0.0)
    }

    /// 1.0 with a clean history, approaching 0 with many recent violations.
    pub fn violation_signal(&self, violations: &[DateTime<Utc>], now: DateTime<Utc>) -> f64 {
        violations
            .iter()
            .map(|at| 1.0 - self.penalty * self.decay(*at, now))
            .product::<f64>()
            .clamp(0.0, 1.0)
    }

    pub fn score(&self, signals: &HealthSignals, now: DateTime<Utc>) -> f64 {
        let w = &self.weights;
        let total = w.engagement * Self::engagement_signal(signals.engagement_rate)
            + w.growth * Self::growth_signal(signals.follower_growth_7d)
            + w.violations * self.violation_signal(&signals.violations, now)
            + w.authenticity * Self::unit(signals.authenticity);
        let score = 100.0 * total;
        if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        }
    }

    /// Drop violations that no longer weigh on the score.
    pub fn prune(&self, signals: &mut HealthSignals, now: DateTime<Utc>) {
        let Some(horizon) = now.checked_sub_signed(self.lookback) else {
            return;
        };
        signals.violations.retain(|at| *at > horizon);
    }
}

/// Letter grade for reports.
pub fn grade(score: f64) -> &'static str {
    match score {
        s if s >= 90.0 => "A+",
        s if s >= 80.0 => "A",
        s if s >= 70.0 => "B",
        s if s >= 60.0 => "C",
        s if s >= 40.0 => "D",
        _ => "F",
    }
}
