//! Urgency triage levels.

use serde::{Deserialize, Serialize};

/// Coarse triage classification attached to every disease match.
///
/// Variants are ordered from least to most urgent.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UrgencyLevel {
    #[default]
    Low,
    Medium,
    High,
    Emergency,
}

/// Score thresholds that map a normalized similarity score to an urgency level.
///
/// A score at or above a threshold gets that level; the highest matching
/// threshold wins.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UrgencyPolicy {
    #[serde(default = "default_emergency")]
    pub emergency: f64,
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

fn default_emergency() -> f64 {
    0.85
}

fn default_high() -> f64 {
    0.65
}

fn default_medium() -> f64 {
    0.40
}

impl Default for UrgencyPolicy {
    fn default() -> Self {
        Self {
            emergency: default_emergency(),
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl UrgencyPolicy {
    pub fn classify(&self, score: f64) -> UrgencyLevel {
        if score >= self.emergency {
            UrgencyLevel::Emergency
        } else if score >= self.high {
            UrgencyLevel::High
        } else if score >= self.medium {
            UrgencyLevel::Medium
        } else {
            UrgencyLevel::Low
        }
    }
}
