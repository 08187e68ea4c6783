use crate::decision_graph::{DecisionGraphState, PatientInfo};
use crate::diagnosis::{DiseaseMatch, UrgencyLevel, overall_urgency};
use crate::phenotype::SelectedPhenotype;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The durable outcome of one completed decision graph session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsultationRecord {
    pub session_id: String,
    pub phenotypes: Vec<SelectedPhenotype>,
    pub diagnosis_results: Vec<DiseaseMatch>,
    pub urgency_level: UrgencyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_info: Option<PatientInfo>,
    pub completed_at: DateTime<Utc>,
}

impl ConsultationRecord {
    /// Captures the completed session. `completed_at` is the diagnosis
    /// timestamp when present.
    pub fn from_state(session_id: impl Into<String>, state: &DecisionGraphState) -> Self {
        Self {
            session_id: session_id.into(),
            phenotypes: state.selected_phenotypes.clone(),
            diagnosis_results: state.diagnosis_results.clone(),
            urgency_level: overall_urgency(&state.diagnosis_results),
            patient_info: state.patient_info.clone(),
            completed_at: state.diagnosis_timestamp.unwrap_or_else(Utc::now),
        }
    }
}
