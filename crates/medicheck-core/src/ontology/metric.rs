use serde::{Deserialize, Serialize};

/// Similarity metric used for phenotype profile matching.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    AncestorInformationContent,
    JaccardSimilarity,
    PhenodigmScore,
}

impl SimilarityMetric {
    /// Raw score treated as a perfect match when normalizing into `[0, 1]`.
    pub fn default_score_ceiling(&self) -> f64 {
        match self {
            Self::AncestorInformationContent => 15.0,
            Self::JaccardSimilarity => 1.0,
            Self::PhenodigmScore => 4.0,
        }
    }
}
