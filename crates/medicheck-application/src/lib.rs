//! Application layer for MediCheck.
//!
//! Coordinates the pure decision graph in `medicheck-core` with the ontology,
//! chat and consultation collaborators:
//!
//! - `store`: the single-writer container holding the session state
//! - `refinement`: one pass over the selected phenotypes' child terms
//! - `orchestrator`: step sequencing, diagnosis submission and completion

pub mod orchestrator;
pub mod refinement;
pub mod store;

pub use orchestrator::{OrchestratorSettings, SessionOrchestrator};
pub use refinement::{ChildSlot, RefinementItem, RefinementProgress, RefinementSession};
pub use store::DecisionGraphStore;
