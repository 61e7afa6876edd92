//! Health inputs and weights.
//!
//! The score itself is computed in `relaypool-core::health`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw signals feeding the health score.
///
/// Engagement, growth and authenticity are supplied by the analytics
/// collaborators; violation timestamps are appended by the dispatcher on
/// failure reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSignals {
    /// Interactions per impression, e.g. 0.02 for 2%
    #[serde(default)]
    pub engagement_rate: f64,
    /// Net follower change over the last seven days
    #[serde(default)]
    pub follower_growth_7d: i64,
    /// Authenticity / content quality in [0, 1]
    #[serde(default = "default_authenticity")]
    pub authenticity: f64,
    /// When failures were recorded, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<DateTime<Utc>>,
}

fn default_authenticity() -> f64 {
    0.5
}

impl Default for HealthSignals {
    fn default() -> Self {
        Self {
            engagement_rate: 0.0,
            follower_growth_7d: 0,
            authenticity: default_authenticity(),
            violations: Vec::new(),
        }
    }
}

/// Partial signal update pushed by an analytics collaborator.
///
/// `None` leaves the stored value untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SignalUpdate {
    pub engagement_rate: Option<f64>,
    pub follower_growth_7d: Option<i64>,
    pub authenticity: Option<f64>,
}

impl SignalUpdate {
    pub fn is_empty(&self) -> bool {
        self.engagement_rate.is_none()
            && self.follower_growth_7d.is_none()
            && self.authenticity.is_none()
    }

    /// Apply to `signals`, clamping authenticity into [0, 1] and ignoring
    /// non-finite rates.
    pub fn apply(&self, signals: &mut HealthSignals) {
        if let Some(rate) = self.engagement_rate.filter(|r| r.is_finite()) {
            signals.engagement_rate = rate.max(0.0);
        }
        if let Some(growth) = self.follower_growth_7d {
            signals.follower_growth_7d = growth;
        }
        if let Some(authenticity) = self.authenticity.filter(|a| a.is_finite()) {
            signals.authenticity = authenticity.clamp(0.0, 1.0);
        }
    }
}

/// Relative importance of each normalized signal. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HealthWeights {
    pub engagement: f64,
    pub growth: f64,
    pub violations: f64,
    pub authenticity: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self { engagement: 0.35, growth: 0.25, violations: 0.25, authenticity: 0.15 }
    }
}

impl HealthWeights {
    pub fn sum(&self) -> f64 {
        self.engagement + self.growth + self.violations + self.authenticity
    }

    pub fn is_valid(&self) -> bool {
        [self.engagement, self.growth, self.violations, self.authenticity]
            .iter()
            .all(|w| w.is_finite() && *w >= 0.0)
            && self.sum() > 0.0
    }

    /// Rescale so the weights sum to exactly 1.
    pub fn normalized(&self) -> Self {
        let total = self.sum();
        if total <= 0.0 || (total - 1.0).abs() < f64::EPSILON {
            return *self;
        }
        Self {
            engagement: self.engagement / total,
            growth: self.growth / total,
            violations: self.violations / total,
            authenticity: self.authenticity / total,
        }
    }
}
