//! Child association wire types.

use crate::phenotype::{DEFAULT_PHENOTYPE_CATEGORY, OntologyTerm};
use serde::{Deserialize, Serialize};

/// One `subclass_of` edge below a parent term, as returned by the hierarchy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildAssociation {
    pub subject: String,
    #[serde(default)]
    pub subject_label: Option<String>,
    #[serde(default)]
    pub subject_category: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ChildAssociation {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            subject_label: None,
            subject_category: None,
            description: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.subject_label = Some(label.into());
        self
    }

    /// Maps the association into a term, applying the ontology fallbacks:
    /// a missing or blank label falls back to the subject id, a missing
    /// category to the phenotype category.
    pub fn into_term(self) -> OntologyTerm {
        let name = self
            .subject_label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| self.subject.clone());
        OntologyTerm {
            id: self.subject,
            name,
            description: self.description,
            category: self
                .subject_category
                .unwrap_or_else(|| DEFAULT_PHENOTYPE_CATEGORY.to_string()),
        }
    }
}

/// Response body of the hierarchy endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildrenPage {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub children: Vec<ChildAssociation>,
    #[serde(default)]
    pub total: usize,
}
