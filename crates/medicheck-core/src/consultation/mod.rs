//! Consultation completion boundary.
//!
//! When a session produces diagnosis results, the orchestrator hands a
//! `ConsultationRecord` to the persistence collaborator and the final results
//! to the navigation collaborator. Both are external to the decision graph.

mod model;
mod sink;

pub use model::ConsultationRecord;
pub use sink::{ConsultationSink, NavigationSink};
