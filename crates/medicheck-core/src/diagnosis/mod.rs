//! Diagnosis domain module.
//!
//! Disease matches returned by the similarity service and the urgency
//! classification derived from them.

mod model;
mod urgency;

pub use model::{DiseaseMatch, overall_urgency};
pub use urgency::{UrgencyLevel, UrgencyPolicy};
