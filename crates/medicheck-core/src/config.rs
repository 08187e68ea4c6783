//! Configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer; every field has a
//! default so an absent or partial file is valid.

use crate::diagnosis::UrgencyPolicy;
use crate::error::{MedicheckError, Result};
use crate::ontology::{DEFAULT_CHILDREN_LIMIT, SimilarityMetric};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_ONTOLOGY_URL: &str = "http://localhost:8500";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MATCH_LIMIT: usize = 10;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct MedicheckConfig {
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub urgency: UrgencyPolicy,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct OntologyConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_children_limit")]
    pub children_limit: usize,
    #[serde(default = "default_match_limit")]
    pub match_limit: usize,
    #[serde(default)]
    pub metric: SimilarityMetric,
    /// Overrides the metric's default normalization ceiling
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_ceiling: Option<f64>,
}

fn default_base_url() -> String {
    DEFAULT_ONTOLOGY_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_children_limit() -> usize {
    DEFAULT_CHILDREN_LIMIT
}

fn default_match_limit() -> usize {
    DEFAULT_MATCH_LIMIT
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            children_limit: default_children_limit(),
            match_limit: default_match_limit(),
            metric: SimilarityMetric::default(),
            score_ceiling: None,
        }
    }
}

impl OntologyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn score_ceiling(&self) -> f64 {
        self.score_ceiling
            .filter(|c| *c > 0.0)
            .unwrap_or_else(|| self.metric.default_score_ceiling())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StorageConfig {
    /// Directory for completed consultation files; platform data dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultations_dir: Option<PathBuf>,
}

impl MedicheckConfig {
    /// Applies `MONARCH_API_URL`, `MEDICHECK_TIMEOUT_SECS` and
    /// `MEDICHECK_SIMILARITY_METRIC` from `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MONARCH_API_URL").filter(|v| !v.trim().is_empty()) {
            self.ontology.base_url = url;
        }
        if let Some(secs) = lookup("MEDICHECK_TIMEOUT_SECS") {
            self.ontology.timeout_secs = secs.trim().parse().map_err(|_| {
                MedicheckError::config(format!("MEDICHECK_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        if let Some(metric) = lookup("MEDICHECK_SIMILARITY_METRIC") {
            self.ontology.metric = metric.trim().parse().map_err(|_| {
                MedicheckError::config(format!("Unknown similarity metric: {}", metric))
            })?;
        }
        Ok(())
    }
}
