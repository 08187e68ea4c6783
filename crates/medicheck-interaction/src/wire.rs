//! Request and response bodies of the Monarch REST proxy, and their mapping
//! into domain types.

use medicheck_core::diagnosis::{DiseaseMatch, UrgencyPolicy};
use medicheck_core::ontology::SimilarityMetric;
use medicheck_core::phenotype::{DEFAULT_PHENOTYPE_CATEGORY, OntologyTerm};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub(crate) const HUMAN_DISEASES: &str = "Human Diseases";

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchItem {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl SearchItem {
    pub fn into_term(self) -> OntologyTerm {
        OntologyTerm {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            description: self.description,
            category: self
                .category
                .unwrap_or_else(|| DEFAULT_PHENOTYPE_CATEGORY.to_string()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProfileSearchRequest<'a> {
    pub phenotype_ids: &'a [String],
    pub search_group: &'static str,
    pub metric: SimilarityMetric,
    pub limit: usize,
}

/// The proxy forwards the upstream semsim payload, which is either a bare
/// list or wrapped in `items`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ProfileSearchResponse {
    List(Vec<ProfileMatch>),
    Wrapped { items: Vec<ProfileMatch> },
}

impl ProfileSearchResponse {
    pub fn into_matches(self) -> Vec<ProfileMatch> {
        match self {
            Self::List(items) | Self::Wrapped { items } => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileMatch {
    pub subject: ProfileSubject,
    #[serde(default)]
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProfileSubject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Normalizes raw similarity scores by `ceiling` and ranks the matches,
/// highest score first.
pub(crate) fn to_disease_matches(
    raw: Vec<ProfileMatch>,
    phenotype_ids: &[String],
    ceiling: f64,
    policy: &UrgencyPolicy,
) -> Vec<DiseaseMatch> {
    let mut matches: Vec<DiseaseMatch> = raw
        .into_iter()
        .map(|m| {
            let name = m.subject.name.unwrap_or_else(|| m.subject.id.clone());
            DiseaseMatch::scored(
                m.subject.id,
                name,
                m.score / ceiling,
                phenotype_ids.to_vec(),
                policy,
            )
            .with_description(m.subject.description)
        })
        .collect();
    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub sources: Option<Vec<String>>,
}
