//! Ontology client trait.

use super::association::ChildAssociation;
use crate::diagnosis::DiseaseMatch;
use crate::error::Result;
use crate::phenotype::OntologyTerm;
use async_trait::async_trait;

/// Number of children requested per parent during refinement.
pub const DEFAULT_CHILDREN_LIMIT: usize = 50;

/// Typed access to the remote ontology search/traversal service.
///
/// # Errors
///
/// Implementations report an unknown term as `MedicheckError::NotFound` and
/// network or server failures as `MedicheckError::Transport`. Callers in the
/// refinement flow treat both as recoverable per-item failures.
#[async_trait]
pub trait OntologyClient: Send + Sync {
    /// Free-text term search, optionally restricted to a Biolink category.
    async fn search_terms(
        &self,
        query: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OntologyTerm>>;

    /// Direct children of `term_id` in the ontology hierarchy, in service order.
    async fn get_children(&self, term_id: &str, limit: usize) -> Result<Vec<ChildAssociation>>;

    /// Ranks diseases by semantic similarity to the given phenotype profile.
    async fn match_diseases(&self, phenotype_ids: &[String]) -> Result<Vec<DiseaseMatch>>;
}
