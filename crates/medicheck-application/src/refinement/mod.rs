//! Refinement traversal.

mod session;

pub use session::{ChildSlot, RefinementItem, RefinementProgress, RefinementSession};
