//! Disease match model.

use super::urgency::{UrgencyLevel, UrgencyPolicy};
use serde::{Deserialize, Serialize};

/// A candidate diagnosis produced by semantic similarity matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiseaseMatch {
    /// Disease identifier (e.g. `MONDO:0005015`)
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Normalized similarity in `[0, 1]`
    pub score: f64,
    /// `score` expressed as a rounded percentage
    pub confidence: u8,
    /// Phenotype ids that were submitted for this match
    #[serde(default)]
    pub matched_phenotypes: Vec<String>,
    pub urgency_level: UrgencyLevel,
}

impl DiseaseMatch {
    /// Builds a match from a normalized score, deriving confidence and urgency.
    ///
    /// Scores outside `[0, 1]` (or NaN) are clamped first.
    pub fn scored(
        id: impl Into<String>,
        name: impl Into<String>,
        score: f64,
        matched_phenotypes: Vec<String>,
        policy: &UrgencyPolicy,
    ) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            score,
            confidence: (score * 100.0).round() as u8,
            matched_phenotypes,
            urgency_level: policy.classify(score),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// The most urgent level across a batch of matches; `Low` for an empty batch.
pub fn overall_urgency(results: &[DiseaseMatch]) -> UrgencyLevel {
    results
        .iter()
        .map(|m| m.urgency_level)
        .max()
        .unwrap_or_default()
}
