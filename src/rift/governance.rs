//! Governance triangle and transition gate
//!
//! Every transition between pipeline stages is scored along three risk
//! axes: attack risk, rollback cost, and stability impact, each in [0, 1].
//! The gate classifies the triangle into one of three terminal verdicts.
//! Classification order is a design decision: a single axis above its
//! threshold is always fatal, even when the aggregate norm would pass, so
//! one catastrophic risk cannot be diluted by two low scores.
//!
//! Under the default thresholds the per-axis maxima (0.2 + 0.2 + 0.1) sum
//! exactly to the aggregate threshold (0.5), which makes the WARNING band
//! unreachable until thresholds are adjusted. That boundary is preserved
//! as-is; the tests construct a reachable WARNING band through relaxed
//! per-axis thresholds.

use crate::rift::error::RiftError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Risk assessment for one proposed stage transition. Computed fresh per
/// transition attempt, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GovernanceTriangle {
    attack_risk: f64,
    rollback_cost: f64,
    stability_impact: f64,
}

impl GovernanceTriangle {
    /// Build a triangle, validating each axis into [0, 1]
    pub fn new(
        attack_risk: f64,
        rollback_cost: f64,
        stability_impact: f64,
    ) -> Result<GovernanceTriangle, RiftError> {
        for (name, value) in [
            ("attack_risk", attack_risk),
            ("rollback_cost", rollback_cost),
            ("stability_impact", stability_impact),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(RiftError::InvalidArgument(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }
        Ok(GovernanceTriangle {
            attack_risk,
            rollback_cost,
            stability_impact,
        })
    }

    /// Build a triangle from known-good axis values, clamping into [0, 1].
    /// Stage implementations use this for their static risk profiles.
    pub fn clamped(attack_risk: f64, rollback_cost: f64, stability_impact: f64) -> GovernanceTriangle {
        let clamp = |v: f64| {
            if v.is_nan() {
                0.0
            } else {
                v.clamp(0.0, 1.0)
            }
        };
        GovernanceTriangle {
            attack_risk: clamp(attack_risk),
            rollback_cost: clamp(rollback_cost),
            stability_impact: clamp(stability_impact),
        }
    }

    pub fn attack_risk(&self) -> f64 {
        self.attack_risk
    }

    pub fn rollback_cost(&self) -> f64 {
        self.rollback_cost
    }

    pub fn stability_impact(&self) -> f64 {
        self.stability_impact
    }

    /// Aggregate norm: the plain sum of the three axes
    pub fn norm(&self) -> f64 {
        self.attack_risk + self.rollback_cost + self.stability_impact
    }
}

/// Per-axis and aggregate thresholds for the gate. Overridable by external
/// configuration; the defaults are the shipped risk model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceThresholds {
    pub attack_risk: f64,
    pub rollback_cost: f64,
    pub stability_impact: f64,
    pub aggregate: f64,
}

impl Default for GovernanceThresholds {
    fn default() -> Self {
        GovernanceThresholds {
            attack_risk: 0.2,
            rollback_cost: 0.2,
            stability_impact: 0.1,
            aggregate: 0.5,
        }
    }
}

/// Terminal classification of a transition. There are no intermediate or
/// retry states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Approved,
    Warning,
    Rejected,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Approved => write!(f, "APPROVED"),
            Verdict::Warning => write!(f, "WARNING"),
            Verdict::Rejected => write!(f, "REJECTED"),
        }
    }
}

/// Pure, stateless transition gate
#[derive(Debug, Clone, Copy, Default)]
pub struct GovernanceGate {
    thresholds: GovernanceThresholds,
}

impl GovernanceGate {
    pub fn new(thresholds: GovernanceThresholds) -> GovernanceGate {
        GovernanceGate { thresholds }
    }

    pub fn thresholds(&self) -> GovernanceThresholds {
        self.thresholds
    }

    /// Classify a triangle. First match wins:
    /// 1. any single axis strictly above its threshold is REJECTED,
    /// 2. a norm strictly above the aggregate threshold is WARNING,
    /// 3. everything else is APPROVED.
    pub fn evaluate(&self, triangle: &GovernanceTriangle) -> Verdict {
        let t = &self.thresholds;
        if triangle.attack_risk() > t.attack_risk
            || triangle.rollback_cost() > t.rollback_cost
            || triangle.stability_impact() > t.stability_impact
        {
            return Verdict::Rejected;
        }
        if triangle.norm() > t.aggregate {
            return Verdict::Warning;
        }
        Verdict::Approved
    }
}
