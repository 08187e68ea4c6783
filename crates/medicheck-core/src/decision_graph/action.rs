//! Closed action set for the decision graph.

use super::state::{PatientInfo, RefinementQuestion, Step};
use crate::chat::ChatMessage;
use crate::diagnosis::DiseaseMatch;
use crate::phenotype::{OntologyTerm, SelectedPhenotype};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything that can happen to a decision graph session.
///
/// Actions that create timestamped data carry their timestamp so that
/// `reduce` stays a pure function and recorded action logs replay exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionGraphAction {
    AddPhenotype {
        phenotype: SelectedPhenotype,
    },
    RemovePhenotype {
        id: String,
    },
    SetRefinementQuestions {
        questions: Vec<RefinementQuestion>,
    },
    /// Fills in the fetched children of the question for `phenotype_id`.
    SetRefinementChildren {
        phenotype_id: String,
        children: Vec<OntologyTerm>,
    },
    /// Selects or deselects one child of question `index`, mirrored into the
    /// selected phenotypes in the same transition.
    ToggleRefinementChild {
        index: usize,
        child_id: String,
        at: DateTime<Utc>,
    },
    AnswerRefinement {
        index: usize,
        child_ids: Vec<String>,
        at: DateTime<Utc>,
    },
    SkipRefinement {
        index: usize,
    },
    /// Moves the refinement pointer back; never forwards.
    RewindRefinement {
        index: usize,
    },
    SetDiagnosisResults {
        results: Vec<DiseaseMatch>,
        timestamp: DateTime<Utc>,
    },
    AddChatMessage {
        message: ChatMessage,
    },
    SetStep {
        step: Step,
    },
    SetLoading {
        loading: bool,
    },
    SetError {
        error: String,
    },
    ClearError,
    SetPatientInfo {
        info: Option<PatientInfo>,
    },
    Reset,
    /// Any action type this build does not know, e.g. from a newer action log.
    #[serde(other)]
    Unknown,
}

impl DecisionGraphAction {
    pub fn toggle_child(index: usize, child_id: impl Into<String>) -> Self {
        Self::ToggleRefinementChild {
            index,
            child_id: child_id.into(),
            at: Utc::now(),
        }
    }

    pub fn answer(index: usize, child_ids: Vec<String>) -> Self {
        Self::AnswerRefinement {
            index,
            child_ids,
            at: Utc::now(),
        }
    }

    pub fn diagnosis_results(results: Vec<DiseaseMatch>) -> Self {
        Self::SetDiagnosisResults {
            results,
            timestamp: Utc::now(),
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self::SetError {
            error: error.into(),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddPhenotype { .. } => "ADD_PHENOTYPE",
            Self::RemovePhenotype { .. } => "REMOVE_PHENOTYPE",
            Self::SetRefinementQuestions { .. } => "SET_REFINEMENT_QUESTIONS",
            Self::SetRefinementChildren { .. } => "SET_REFINEMENT_CHILDREN",
            Self::ToggleRefinementChild { .. } => "TOGGLE_REFINEMENT_CHILD",
            Self::AnswerRefinement { .. } => "ANSWER_REFINEMENT",
            Self::SkipRefinement { .. } => "SKIP_REFINEMENT",
            Self::RewindRefinement { .. } => "REWIND_REFINEMENT",
            Self::SetDiagnosisResults { .. } => "SET_DIAGNOSIS_RESULTS",
            Self::AddChatMessage { .. } => "ADD_CHAT_MESSAGE",
            Self::SetStep { .. } => "SET_STEP",
            Self::SetLoading { .. } => "SET_LOADING",
            Self::SetError { .. } => "SET_ERROR",
            Self::ClearError => "CLEAR_ERROR",
            Self::SetPatientInfo { .. } => "SET_PATIENT_INFO",
            Self::Reset => "RESET",
            Self::Unknown => "UNKNOWN",
        }
    }
}
