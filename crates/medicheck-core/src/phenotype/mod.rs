//! Phenotype domain module.
//!
//! Ontology terms as returned by the ontology service and the phenotypes a
//! clinician has selected during a session.

mod model;

pub use model::{OntologyTerm, PhenotypeSource, SelectedPhenotype, DEFAULT_PHENOTYPE_CATEGORY};
