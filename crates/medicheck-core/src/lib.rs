pub mod chat;
pub mod config;
pub mod consultation;
pub mod decision_graph;
pub mod diagnosis;
pub mod error;
pub mod ontology;
pub mod phenotype;

// Re-export common error type
pub use error::MedicheckError;
