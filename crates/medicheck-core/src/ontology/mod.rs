//! Ontology service boundary.
//!
//! - `association`: wire shapes returned by hierarchy lookups, and their
//!   mapping into `OntologyTerm`
//! - `client`: the `OntologyClient` trait consumed by refinement and diagnosis
//! - `metric`: similarity metrics understood by the matching endpoint

mod association;
mod client;
mod metric;

pub use association::{ChildAssociation, ChildrenPage};
pub use client::{DEFAULT_CHILDREN_LIMIT, OntologyClient};
pub use metric::SimilarityMetric;
