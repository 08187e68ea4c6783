//! Phenotype and ontology term models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to child terms when the ontology service omits one.
pub const DEFAULT_PHENOTYPE_CATEGORY: &str = "biolink:PhenotypicFeature";

/// A node in the phenotype ontology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyTerm {
    /// Stable ontology identifier (e.g. `HP:0002315`)
    pub id: String,
    /// Display label
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Biolink category of the term
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    DEFAULT_PHENOTYPE_CATEGORY.to_string()
}

impl OntologyTerm {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            category: default_category(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// How a phenotype entered the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PhenotypeSource {
    /// Picked from a free-text term search.
    Search,
    /// Picked as a more specific child during refinement.
    Refinement,
    /// Accepted from a suggestion list.
    Suggestion,
}

/// A phenotype the clinician has selected in the current session.
///
/// Entries are never mutated once created; they are only added or removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedPhenotype {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub added_at: DateTime<Utc>,
    pub source: PhenotypeSource,
    /// Parent term for refinement selections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl SelectedPhenotype {
    /// Builds a selection from an ontology term picked in search or from a suggestion.
    pub fn from_term(term: &OntologyTerm, source: PhenotypeSource, added_at: DateTime<Utc>) -> Self {
        Self {
            id: term.id.clone(),
            name: term.name.clone(),
            description: term.description.clone(),
            added_at,
            source,
            parent_id: None,
        }
    }

    /// Builds a refinement selection for `child`, a more specific term of `parent_id`.
    pub fn refinement(child: &OntologyTerm, parent_id: &str, added_at: DateTime<Utc>) -> Self {
        Self {
            id: child.id.clone(),
            name: child.name.clone(),
            description: child.description.clone(),
            added_at,
            source: PhenotypeSource::Refinement,
            parent_id: Some(parent_id.to_string()),
        }
    }

    pub fn is_refinement(&self) -> bool {
        self.source == PhenotypeSource::Refinement
    }
}
