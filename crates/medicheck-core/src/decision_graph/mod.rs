//! Decision graph state machine.
//!
//! The aggregate session state of one symptom-refinement run, the closed set
//! of actions that may change it, and the pure transition function.
//!
//! # Module Structure
//!
//! - `state`: the aggregate (`DecisionGraphState`) and its parts
//! - `action`: the closed action set (`DecisionGraphAction`)
//! - `reducer`: `reduce`, mapping (state, action) to a new state
//!
//! # Usage
//!
//! ```ignore
//! use medicheck_core::decision_graph::{reduce, DecisionGraphAction, DecisionGraphState};
//!
//! let state = DecisionGraphState::default();
//! let next = reduce(&state, &DecisionGraphAction::SetLoading { loading: true });
//! ```

mod action;
mod reducer;
mod state;

#[cfg(test)]
mod reducer_test;

pub use action::DecisionGraphAction;
pub use reducer::{reduce, replay};
pub use state::{
    AgeCategory, BiologicalSex, DecisionGraphState, PatientInfo, RefinementQuestion, Step,
};
