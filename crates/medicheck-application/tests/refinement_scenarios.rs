//! End-to-end refinement scenarios driven through `SessionOrchestrator`.

use async_trait::async_trait;
use medicheck_application::{RefinementItem, SessionOrchestrator};
use medicheck_core::decision_graph::{DecisionGraphAction, Step};
use medicheck_core::diagnosis::{DiseaseMatch, UrgencyPolicy};
use medicheck_core::error::{MedicheckError, Result};
use medicheck_core::ontology::{ChildAssociation, OntologyClient};
use medicheck_core::phenotype::{OntologyTerm, PhenotypeSource};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;

const HEADACHE: &str = "HP:0002315";
const FEVER: &str = "HP:0001945";

/// Ontology double with scripted child lookups.
///
/// `signal_on_call` notifies when a term is looked up; `wait_before_reply`
/// holds a lookup until its gate is notified.
#[derive(Default)]
struct ScriptedOntology {
    children: HashMap<String, Result<Vec<ChildAssociation>>>,
    signal_on_call: HashMap<String, Arc<Notify>>,
    wait_before_reply: HashMap<String, Arc<Notify>>,
}

impl ScriptedOntology {
    fn with_children(mut self, term_id: &str, children: Result<Vec<ChildAssociation>>) -> Self {
        self.children.insert(term_id.to_string(), children);
        self
    }
}

#[async_trait]
impl OntologyClient for ScriptedOntology {
    async fn search_terms(
        &self,
        _query: &str,
        _category: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<OntologyTerm>> {
        Ok(vec![])
    }

    async fn get_children(&self, term_id: &str, limit: usize) -> Result<Vec<ChildAssociation>> {
        assert_eq!(limit, 50);
        if let Some(signal) = self.signal_on_call.get(term_id) {
            signal.notify_one();
        }
        if let Some(gate) = self.wait_before_reply.get(term_id) {
            gate.notified().await;
        }
        self.children
            .get(term_id)
            .cloned()
            .unwrap_or_else(|| Err(MedicheckError::not_found("term", term_id)))
    }

    async fn match_diseases(&self, phenotype_ids: &[String]) -> Result<Vec<DiseaseMatch>> {
        Ok(vec![DiseaseMatch::scored(
            "MONDO:0005277",
            "Migraine",
            0.6,
            phenotype_ids.to_vec(),
            &UrgencyPolicy::default(),
        )])
    }
}

async fn select(orchestrator: &SessionOrchestrator, terms: &[(&str, &str)]) {
    for (id, name) in terms {
        orchestrator
            .add_phenotype(&OntologyTerm::new(*id, *name), PhenotypeSource::Search)
            .await
            .unwrap();
    }
}

async fn headache_and_fever(ontology: ScriptedOntology) -> SessionOrchestrator {
    let orchestrator = SessionOrchestrator::new(Arc::new(ontology));
    select(&orchestrator, &[(HEADACHE, "Headache"), (FEVER, "Fever")]).await;
    orchestrator
}

#[tokio::test]
async fn headache_and_fever_toggle_round_trip() {
    let ontology = ScriptedOntology::default()
        .with_children(
            HEADACHE,
            Ok(vec![ChildAssociation::new("HP:0002325").with_label("Sudden headache")]),
        )
        .with_children(FEVER, Ok(vec![]));
    let orchestrator = headache_and_fever(ontology).await;
    let before = orchestrator.state().await.selected_phenotypes;

    assert_eq!(orchestrator.proceed().await.unwrap(), Step::Refine);
    let items = orchestrator.refinement().await.unwrap().items().await;
    assert_eq!(items[0].children().len(), 1);
    assert_eq!(items[0].children()[0].name, "Sudden headache");
    assert!(items[1].has_no_options());

    assert!(orchestrator.toggle_child("HP:0002325").await.unwrap());
    let state = orchestrator.state().await;
    let refined = state.refined_phenotypes();
    assert_eq!(refined.len(), 1);
    assert_eq!(refined[0].source, PhenotypeSource::Refinement);
    assert_eq!(refined[0].parent_id.as_deref(), Some(HEADACHE));

    assert!(!orchestrator.toggle_child("HP:0002325").await.unwrap());
    assert_eq!(orchestrator.state().await.selected_phenotypes, before);
}

#[tokio::test]
async fn transport_error_on_second_phenotype_is_local() {
    let ontology = ScriptedOntology::default()
        .with_children(HEADACHE, Ok(vec![ChildAssociation::new("HP:0002325")]))
        .with_children(FEVER, Err(MedicheckError::transport("HTTP 503 Service Unavailable")));
    let orchestrator = headache_and_fever(ontology).await;

    orchestrator.proceed().await.unwrap();
    let items = orchestrator.refinement().await.unwrap().items().await;
    assert_eq!(items[0].children().len(), 1);
    assert!(items[0].error().is_none());
    assert!(items[1].error().is_some());
    assert!(orchestrator.state().await.error.is_none());

    assert_eq!(orchestrator.next_question().await.unwrap(), 1);
    assert_eq!(orchestrator.skip().await.unwrap(), Step::Results);
}

#[tokio::test]
async fn skip_then_answer() {
    let ontology = ScriptedOntology::default()
        .with_children(HEADACHE, Ok(vec![ChildAssociation::new("HP:0002325")]))
        .with_children(
            FEVER,
            Ok(vec![ChildAssociation::new("HP:0011134").with_label("Low-grade fever")]),
        );
    let orchestrator = headache_and_fever(ontology).await;
    orchestrator.proceed().await.unwrap();

    assert_eq!(orchestrator.skip().await.unwrap(), Step::Refine);
    assert_eq!(
        orchestrator
            .answer(vec!["HP:0011134".to_string()])
            .await
            .unwrap(),
        Step::Results
    );

    let state = orchestrator.state().await;
    assert_eq!(state.current_refinement_index, 2);
    assert_eq!(state.refined_phenotypes().len(), 1);
    assert_eq!(
        state.diagnosis_results[0].matched_phenotypes,
        vec![HEADACHE.to_string(), FEVER.to_string(), "HP:0011134".to_string()]
    );
}

#[tokio::test]
async fn out_of_order_completion_lands_in_the_right_slots() {
    // Headache's lookup is held until fever's lookup has been issued, so
    // fever completes first.
    let gate = Arc::new(Notify::new());
    let mut ontology = ScriptedOntology::default()
        .with_children(
            HEADACHE,
            Ok(vec![ChildAssociation::new("HP:0002325").with_label("Sudden headache")]),
        )
        .with_children(
            FEVER,
            Ok(vec![ChildAssociation::new("HP:0011134").with_label("Low-grade fever")]),
        );
    ontology
        .wait_before_reply
        .insert(HEADACHE.to_string(), gate.clone());
    ontology.signal_on_call.insert(FEVER.to_string(), gate);
    let orchestrator = headache_and_fever(ontology).await;

    orchestrator.proceed().await.unwrap();

    let items = orchestrator.refinement().await.unwrap().items().await;
    assert_eq!(items[0].phenotype_id, HEADACHE);
    assert_eq!(items[0].children()[0].id, "HP:0002325");
    assert_eq!(items[1].phenotype_id, FEVER);
    assert_eq!(items[1].children()[0].id, "HP:0011134");

    let completion_order: Vec<String> = orchestrator
        .store()
        .history()
        .await
        .into_iter()
        .filter_map(|action| match action {
            DecisionGraphAction::SetRefinementChildren { phenotype_id, .. } => Some(phenotype_id),
            _ => None,
        })
        .collect();
    assert_eq!(completion_order, vec![FEVER.to_string(), HEADACHE.to_string()]);

    let state = orchestrator.state().await;
    assert_eq!(state.refinement_questions[0].child_terms[0].id, "HP:0002325");
    assert_eq!(state.refinement_questions[1].child_terms[0].id, "HP:0011134");
}

#[tokio::test]
async fn results_arriving_after_back_are_discarded() {
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let mut ontology = ScriptedOntology::default()
        .with_children(HEADACHE, Ok(vec![ChildAssociation::new("HP:0002325")]));
    ontology
        .signal_on_call
        .insert(HEADACHE.to_string(), started.clone());
    ontology
        .wait_before_reply
        .insert(HEADACHE.to_string(), release.clone());

    let orchestrator = Arc::new(SessionOrchestrator::new(Arc::new(ontology)));
    select(&orchestrator, &[(HEADACHE, "Headache")]).await;

    let entering = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.proceed().await })
    };
    started.notified().await;
    let session = orchestrator.refinement().await.unwrap();

    assert_eq!(orchestrator.back().await.unwrap(), Step::Search);
    release.notify_one();
    entering.await.unwrap().unwrap();

    let state = orchestrator.state().await;
    assert_eq!(state.current_step, Step::Search);
    assert!(state.refinement_questions[0].child_terms.is_empty());
    assert!(orchestrator.refinement().await.is_none());
    assert!(session.items().await.iter().all(RefinementItem::is_loading));
}
