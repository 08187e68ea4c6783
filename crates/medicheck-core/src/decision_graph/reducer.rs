//! Pure transition function for the decision graph.
//!
//! `reduce` never mutates its input; every call returns a fresh state value.
//! Actions whose preconditions do not hold (duplicate ids, out-of-range
//! question indices, chat before diagnosis) return the state unchanged.

use super::action::DecisionGraphAction;
use super::state::{DecisionGraphState, RefinementQuestion};
use crate::phenotype::SelectedPhenotype;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};

/// Applies `action` to `state` and returns the resulting state.
pub fn reduce(state: &DecisionGraphState, action: &DecisionGraphAction) -> DecisionGraphState {
    use DecisionGraphAction as A;

    match action {
        A::AddPhenotype { phenotype } => {
            if state.has_phenotype(&phenotype.id) {
                return state.clone();
            }
            let mut next = state.clone();
            next.selected_phenotypes.push(phenotype.clone());
            sync_selected_children(&mut next);
            next
        }

        A::RemovePhenotype { id } => remove_phenotype(state, id),

        A::SetRefinementQuestions { questions } => {
            let mut next = state.clone();
            let mut seen = HashSet::new();
            next.refinement_questions = questions
                .iter()
                .filter(|q| state.has_phenotype(&q.phenotype_id))
                .filter(|q| seen.insert(q.phenotype_id.clone()))
                .cloned()
                .collect();
            next.current_refinement_index = 0;
            sync_selected_children(&mut next);
            next
        }

        A::SetRefinementChildren {
            phenotype_id,
            children,
        } => {
            let Some(position) = state
                .refinement_questions
                .iter()
                .position(|q| &q.phenotype_id == phenotype_id)
            else {
                return state.clone();
            };
            let mut next = state.clone();
            next.refinement_questions[position].child_terms = children.clone();
            next
        }

        A::ToggleRefinementChild {
            index,
            child_id,
            at,
        } => toggle_child(state, *index, child_id, *at),

        A::AnswerRefinement {
            index,
            child_ids,
            at,
        } => answer(state, *index, child_ids, *at),

        A::SkipRefinement { index } => {
            if *index >= state.refinement_questions.len() {
                return state.clone();
            }
            let mut next = state.clone();
            next.refinement_questions[*index].answered = true;
            next.current_refinement_index = index + 1;
            next
        }

        A::RewindRefinement { index } => {
            if *index >= state.current_refinement_index {
                return state.clone();
            }
            let mut next = state.clone();
            next.current_refinement_index = *index;
            next
        }

        A::SetDiagnosisResults { results, timestamp } => {
            let mut next = state.clone();
            next.diagnosis_results = results.clone();
            next.diagnosis_timestamp = (!results.is_empty()).then_some(*timestamp);
            next
        }

        A::AddChatMessage { message } => {
            if !state.has_diagnosis() {
                return state.clone();
            }
            let mut next = state.clone();
            next.chat_messages.push(message.clone());
            next
        }

        A::SetStep { step } => DecisionGraphState {
            current_step: *step,
            ..state.clone()
        },

        A::SetLoading { loading } => DecisionGraphState {
            is_loading: *loading,
            ..state.clone()
        },

        A::SetError { error } => DecisionGraphState {
            error: Some(error.clone()),
            is_loading: false,
            ..state.clone()
        },

        A::ClearError => DecisionGraphState {
            error: None,
            ..state.clone()
        },

        A::SetPatientInfo { info } => DecisionGraphState {
            patient_info: info.clone(),
            ..state.clone()
        },

        A::Reset => DecisionGraphState::default(),

        A::Unknown => state.clone(),
    }
}

/// Folds an action log over the initial state.
pub fn replay<'a>(actions: impl IntoIterator<Item = &'a DecisionGraphAction>) -> DecisionGraphState {
    actions
        .into_iter()
        .fold(DecisionGraphState::default(), |state, action| {
            reduce(&state, action)
        })
}

fn remove_phenotype(state: &DecisionGraphState, id: &str) -> DecisionGraphState {
    let Some(removed) = state.selected_phenotypes.iter().find(|p| p.id == id) else {
        return state.clone();
    };

    let mut next = state.clone();
    if removed.is_refinement() {
        next.selected_phenotypes.retain(|p| p.id != id);
    } else {
        // A primary phenotype takes its refinements and its question with it.
        next.selected_phenotypes
            .retain(|p| p.id != id && p.parent_id.as_deref() != Some(id));
        let position = state
            .refinement_questions
            .iter()
            .position(|q| q.phenotype_id == id);
        next.refinement_questions.retain(|q| q.phenotype_id != id);
        // The pointer stays on the same question when an earlier one goes.
        if position.is_some_and(|p| p < state.current_refinement_index) {
            next.current_refinement_index -= 1;
        }
    }
    next.current_refinement_index = next
        .current_refinement_index
        .min(next.refinement_questions.len());
    sync_selected_children(&mut next);
    next
}

fn toggle_child(
    state: &DecisionGraphState,
    index: usize,
    child_id: &str,
    at: DateTime<Utc>,
) -> DecisionGraphState {
    let Some(question) = state.refinement_questions.get(index) else {
        return state.clone();
    };
    let Some(child) = question.child(child_id) else {
        return state.clone();
    };

    let existing = state.selected_phenotypes.iter().find(|p| p.id == child_id);
    let mut next = state.clone();
    match existing {
        Some(p) if is_refinement_of(p, &question.phenotype_id) => {
            next.selected_phenotypes.retain(|p| p.id != child_id);
        }
        // Selected elsewhere (directly or under another parent): ids stay unique.
        Some(_) => return state.clone(),
        None => {
            next.selected_phenotypes.push(SelectedPhenotype::refinement(
                child,
                &question.phenotype_id,
                at,
            ));
        }
    }
    sync_selected_children(&mut next);
    next
}

fn answer(
    state: &DecisionGraphState,
    index: usize,
    child_ids: &[String],
    at: DateTime<Utc>,
) -> DecisionGraphState {
    let Some(question) = state.refinement_questions.get(index) else {
        return state.clone();
    };
    let parent_id = question.phenotype_id.clone();
    let wanted: BTreeSet<&str> = child_ids
        .iter()
        .map(String::as_str)
        .filter(|id| question.child(id).is_some())
        .collect();

    let mut next = state.clone();
    next.selected_phenotypes
        .retain(|p| !is_refinement_of(p, &parent_id) || wanted.contains(p.id.as_str()));
    for child in question.child_terms.iter().filter(|c| wanted.contains(c.id.as_str())) {
        if !next.has_phenotype(&child.id) {
            next.selected_phenotypes
                .push(SelectedPhenotype::refinement(child, &parent_id, at));
        }
    }

    next.refinement_questions[index].answered = true;
    next.current_refinement_index = index + 1;
    sync_selected_children(&mut next);
    next
}

fn is_refinement_of(phenotype: &SelectedPhenotype, parent_id: &str) -> bool {
    phenotype.is_refinement() && phenotype.parent_id.as_deref() == Some(parent_id)
}

/// Recomputes every question's `selected_child_ids` from the selected
/// phenotypes, which are the single source of truth for refinement choices.
fn sync_selected_children(state: &mut DecisionGraphState) {
    let selected = &state.selected_phenotypes;
    for question in state.refinement_questions.iter_mut() {
        question.selected_child_ids = selected_children_of(selected, question);
    }
}

fn selected_children_of(
    selected: &[SelectedPhenotype],
    question: &RefinementQuestion,
) -> BTreeSet<String> {
    selected
        .iter()
        .filter(|p| is_refinement_of(p, &question.phenotype_id))
        .map(|p| p.id.clone())
        .collect()
}
