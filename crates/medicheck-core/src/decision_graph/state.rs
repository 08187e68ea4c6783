//! Aggregate session state.

use crate::chat::ChatMessage;
use crate::diagnosis::DiseaseMatch;
use crate::phenotype::{OntologyTerm, SelectedPhenotype};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Step of the decision graph workflow, in workflow order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Step {
    #[default]
    Search,
    Refine,
    Results,
    Chat,
}

impl Step {
    /// The step `proceed` leads to, `None` for the terminal step.
    pub fn next(&self) -> Option<Step> {
        match self {
            Step::Search => Some(Step::Refine),
            Step::Refine => Some(Step::Results),
            Step::Results => Some(Step::Chat),
            Step::Chat => None,
        }
    }

    /// The step `back` leads to, `None` for the first step.
    pub fn previous(&self) -> Option<Step> {
        match self {
            Step::Search => None,
            Step::Refine => Some(Step::Search),
            Step::Results => Some(Step::Refine),
            Step::Chat => Some(Step::Results),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgeCategory {
    Infant,
    Child,
    Adolescent,
    Adult,
    Elderly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BiologicalSex {
    Female,
    Male,
    Other,
}

/// Optional demographic context for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_category: Option<AgeCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub biological_sex: Option<BiologicalSex>,
}

/// One refinement prompt: "which of these more specific terms applies?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementQuestion {
    /// Parent phenotype being refined
    pub phenotype_id: String,
    pub phenotype_name: String,
    /// More specific candidates, in ontology order; empty until fetched
    #[serde(default)]
    pub child_terms: Vec<OntologyTerm>,
    #[serde(default)]
    pub answered: bool,
    #[serde(default)]
    pub selected_child_ids: BTreeSet<String>,
}

impl RefinementQuestion {
    /// An unanswered question with no children loaded yet.
    pub fn pending(phenotype: &SelectedPhenotype) -> Self {
        Self {
            phenotype_id: phenotype.id.clone(),
            phenotype_name: phenotype.name.clone(),
            child_terms: Vec::new(),
            answered: false,
            selected_child_ids: BTreeSet::new(),
        }
    }

    pub fn child(&self, child_id: &str) -> Option<&OntologyTerm> {
        self.child_terms.iter().find(|c| c.id == child_id)
    }
}

/// The aggregate root of a decision graph session.
///
/// Sessions are ephemeral: this value lives in memory only and is replaced
/// wholesale by every transition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionGraphState {
    pub selected_phenotypes: Vec<SelectedPhenotype>,
    pub refinement_questions: Vec<RefinementQuestion>,
    /// Pointer into `refinement_questions`; equal to its length once refinement is complete
    pub current_refinement_index: usize,
    pub diagnosis_results: Vec<DiseaseMatch>,
    pub diagnosis_timestamp: Option<DateTime<Utc>>,
    pub chat_messages: Vec<ChatMessage>,
    pub current_step: Step,
    pub is_loading: bool,
    pub error: Option<String>,
    pub patient_info: Option<PatientInfo>,
}

impl DecisionGraphState {
    pub fn has_phenotype(&self, id: &str) -> bool {
        self.selected_phenotypes.iter().any(|p| p.id == id)
    }

    /// Phenotypes selected directly (search or suggestion), in selection order.
    pub fn primary_phenotypes(&self) -> impl Iterator<Item = &SelectedPhenotype> {
        self.selected_phenotypes.iter().filter(|p| !p.is_refinement())
    }

    /// Phenotypes selected while refining, in selection order.
    pub fn refined_phenotypes(&self) -> Vec<&SelectedPhenotype> {
        self.selected_phenotypes
            .iter()
            .filter(|p| p.is_refinement())
            .collect()
    }

    /// Every selected phenotype id, primary and refined, in selection order.
    pub fn all_phenotype_ids(&self) -> Vec<String> {
        self.selected_phenotypes.iter().map(|p| p.id.clone()).collect()
    }

    pub fn question_for(&self, phenotype_id: &str) -> Option<&RefinementQuestion> {
        self.refinement_questions
            .iter()
            .find(|q| q.phenotype_id == phenotype_id)
    }

    pub fn is_refinement_complete(&self) -> bool {
        self.current_refinement_index >= self.refinement_questions.len()
    }

    pub fn has_diagnosis(&self) -> bool {
        !self.diagnosis_results.is_empty()
    }
}
