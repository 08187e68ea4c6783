//! Step sequencing for one decision graph session.
//!
//! `SessionOrchestrator` drives `search → refine → results → chat`. It builds
//! the refinement questions when leaving `search`, submits the combined
//! phenotype set for disease matching once refinement is done, and fires the
//! completion event (consultation persistence, then navigation) on the first
//! non-empty results.

use crate::refinement::{RefinementProgress, RefinementSession};
use crate::store::DecisionGraphStore;
use chrono::Utc;
use medicheck_core::chat::{ChatMessage, ChatRequest, ChatService};
use medicheck_core::config::{DEFAULT_TIMEOUT_SECS, OntologyConfig};
use medicheck_core::consultation::{ConsultationRecord, ConsultationSink, NavigationSink};
use medicheck_core::decision_graph::{
    DecisionGraphAction, DecisionGraphState, PatientInfo, RefinementQuestion, Step,
};
use medicheck_core::diagnosis::DiseaseMatch;
use medicheck_core::error::{MedicheckError, Result};
use medicheck_core::ontology::{DEFAULT_CHILDREN_LIMIT, OntologyClient};
use medicheck_core::phenotype::{OntologyTerm, PhenotypeSource, SelectedPhenotype};
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Tunables for ontology calls made by the orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    /// Children requested per refinement question
    pub children_limit: usize,
    /// Upper bound for each ontology or chat call
    pub request_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            children_limit: DEFAULT_CHILDREN_LIMIT,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &OntologyConfig) -> Self {
        Self {
            children_limit: config.children_limit,
            request_timeout: config.timeout(),
        }
    }
}

pub struct SessionOrchestrator {
    store: DecisionGraphStore,
    ontology: Arc<dyn OntologyClient>,
    chat: Option<Arc<dyn ChatService>>,
    consultations: Option<Arc<dyn ConsultationSink>>,
    navigation: Option<Arc<dyn NavigationSink>>,
    settings: OrchestratorSettings,
    session_id: RwLock<String>,
    refinement: RwLock<Option<Arc<RefinementSession>>>,
    /// Set once the completion event has fired for the current session
    completed: AtomicBool,
}

impl SessionOrchestrator {
    pub fn new(ontology: Arc<dyn OntologyClient>) -> Self {
        Self {
            store: DecisionGraphStore::new(),
            ontology,
            chat: None,
            consultations: None,
            navigation: None,
            settings: OrchestratorSettings::default(),
            session_id: RwLock::new(Uuid::new_v4().to_string()),
            refinement: RwLock::new(None),
            completed: AtomicBool::new(false),
        }
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_store(mut self, store: DecisionGraphStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn ChatService>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_consultation_sink(mut self, sink: Arc<dyn ConsultationSink>) -> Self {
        self.consultations = Some(sink);
        self
    }

    pub fn with_navigation_sink(mut self, sink: Arc<dyn NavigationSink>) -> Self {
        self.navigation = Some(sink);
        self
    }

    pub fn store(&self) -> &DecisionGraphStore {
        &self.store
    }

    pub async fn state(&self) -> DecisionGraphState {
        self.store.snapshot().await
    }

    pub async fn session_id(&self) -> String {
        self.session_id.read().await.clone()
    }

    /// The refinement pass of the current visit to `refine`, if any.
    pub async fn refinement(&self) -> Option<Arc<RefinementSession>> {
        self.refinement.read().await.clone()
    }

    // ============================================================================
    // Selection
    // ============================================================================

    /// Selects a term found by search or offered as a suggestion.
    ///
    /// Refinement children are selected through the refinement session instead.
    pub async fn add_phenotype(
        &self,
        term: &OntologyTerm,
        source: PhenotypeSource,
    ) -> Result<DecisionGraphState> {
        if source == PhenotypeSource::Refinement {
            return Err(MedicheckError::invalid_transition(
                "Refinement terms are selected from a refinement question",
            ));
        }
        let phenotype = SelectedPhenotype::from_term(term, source, Utc::now());
        Ok(self
            .store
            .dispatch(DecisionGraphAction::AddPhenotype { phenotype })
            .await)
    }

    pub async fn remove_phenotype(&self, id: &str) -> DecisionGraphState {
        let state = self
            .store
            .dispatch(DecisionGraphAction::RemovePhenotype { id: id.to_string() })
            .await;
        if let Some(session) = self.refinement().await {
            session.sync_with(&state).await;
        }
        state
    }

    pub async fn set_patient_info(&self, info: Option<PatientInfo>) -> DecisionGraphState {
        self.store
            .dispatch(DecisionGraphAction::SetPatientInfo { info })
            .await
    }

    pub async fn clear_error(&self) -> DecisionGraphState {
        self.store.dispatch(DecisionGraphAction::ClearError).await
    }

    // ============================================================================
    // Step navigation
    // ============================================================================

    /// Moves forward from the current step.
    ///
    /// - `search`: enters refinement and loads child terms; fails with
    ///   `InvalidTransition` when nothing is selected
    /// - `refine`: submits the phenotypes for disease matching
    /// - `results`: opens the chat
    ///
    /// Returns the step the session is on afterwards.
    pub async fn proceed(&self) -> Result<Step> {
        let state = self.store.snapshot().await;
        match state.current_step {
            Step::Search => {
                if state.selected_phenotypes.is_empty() {
                    return Err(self
                        .fail(MedicheckError::invalid_transition(
                            "Select at least one symptom before refining",
                        ))
                        .await);
                }
                self.enter_refinement(&state).await
            }
            Step::Refine => {
                self.submit_diagnosis().await?;
                Ok(Step::Results)
            }
            Step::Results => {
                if !state.has_diagnosis() {
                    return Err(MedicheckError::invalid_transition(
                        "No diagnosis results to discuss",
                    ));
                }
                self.set_step(Step::Chat).await;
                Ok(Step::Chat)
            }
            Step::Chat => Err(MedicheckError::invalid_transition(
                "Chat is the last step",
            )),
        }
    }

    /// Moves back one step without discarding collected data.
    pub async fn back(&self) -> Result<Step> {
        let state = self.store.snapshot().await;
        match state.current_step {
            Step::Search => Err(MedicheckError::invalid_transition(
                "Search is the first step",
            )),
            Step::Refine => {
                self.close_refinement().await;
                self.set_step(Step::Search).await;
                Ok(Step::Search)
            }
            Step::Results => {
                self.set_step(Step::Refine).await;
                let (session, opened) = match self.refinement().await {
                    Some(session) => (session, false),
                    None => (self.open_refinement(&state.refinement_questions).await, true),
                };
                session.revisit_last().await?;
                if opened {
                    session.load_children().await;
                }
                Ok(Step::Refine)
            }
            Step::Chat => {
                self.set_step(Step::Results).await;
                Ok(Step::Results)
            }
        }
    }

    /// Changes only the step; a pending error stays until it is dismissed or
    /// the failed operation is retried.
    async fn set_step(&self, step: Step) {
        self.store.dispatch(DecisionGraphAction::SetStep { step }).await;
    }

    /// Builds one question per directly selected phenotype, keeping questions
    /// (and their fetched children) from an earlier visit, then loads the
    /// missing children.
    async fn enter_refinement(&self, state: &DecisionGraphState) -> Result<Step> {
        let questions: Vec<RefinementQuestion> = state
            .primary_phenotypes()
            .map(|p| {
                state
                    .question_for(&p.id)
                    .cloned()
                    .unwrap_or_else(|| RefinementQuestion::pending(p))
            })
            .collect();
        tracing::info!(
            "[Orchestrator] Entering refinement with {} questions",
            questions.len()
        );

        self.store.dispatch(DecisionGraphAction::ClearError).await;
        let state = self
            .store
            .dispatch(DecisionGraphAction::SetRefinementQuestions { questions })
            .await;
        let session = self.open_refinement(&state.refinement_questions).await;
        self.set_step(Step::Refine).await;
        session.load_children().await;
        Ok(Step::Refine)
    }

    async fn open_refinement(&self, questions: &[RefinementQuestion]) -> Arc<RefinementSession> {
        let token = self.store.begin_refinement().await;
        let session = Arc::new(RefinementSession::new(
            self.ontology.clone(),
            self.store.clone(),
            token,
            questions,
            self.settings.children_limit,
            self.settings.request_timeout,
        ));
        *self.refinement.write().await = Some(session.clone());
        session
    }

    async fn close_refinement(&self) {
        self.store.end_refinement().await;
        *self.refinement.write().await = None;
    }

    // ============================================================================
    // Refinement
    // ============================================================================

    async fn active_refinement(&self) -> Result<Arc<RefinementSession>> {
        if self.store.snapshot().await.current_step != Step::Refine {
            return Err(MedicheckError::invalid_transition("Not refining"));
        }
        self.refinement()
            .await
            .ok_or_else(|| MedicheckError::invalid_transition("No refinement in progress"))
    }

    pub async fn next_question(&self) -> Result<usize> {
        Ok(self.active_refinement().await?.next().await)
    }

    pub async fn previous_question(&self) -> Result<usize> {
        self.active_refinement().await?.prev().await
    }

    /// Selects or deselects a child of the current question.
    pub async fn toggle_child(&self, child_id: &str) -> Result<bool> {
        self.active_refinement().await?.toggle_child(child_id).await
    }

    /// Answers the current question; answering the last one submits the diagnosis.
    pub async fn answer(&self, child_ids: Vec<String>) -> Result<Step> {
        let progress = self.active_refinement().await?.answer(child_ids).await?;
        self.after_progress(progress).await
    }

    /// Answers the current question with its current selection.
    pub async fn confirm(&self) -> Result<Step> {
        let progress = self.active_refinement().await?.confirm().await?;
        self.after_progress(progress).await
    }

    /// Skips the current question; skipping the last one submits the diagnosis.
    pub async fn skip(&self) -> Result<Step> {
        let progress = self.active_refinement().await?.skip().await?;
        self.after_progress(progress).await
    }

    async fn after_progress(&self, progress: RefinementProgress) -> Result<Step> {
        match progress {
            RefinementProgress::Advanced(_) => Ok(Step::Refine),
            RefinementProgress::Exhausted => {
                self.submit_diagnosis().await?;
                Ok(Step::Results)
            }
        }
    }

    // ============================================================================
    // Diagnosis
    // ============================================================================

    /// Matches the full phenotype set (selected and refined) against diseases.
    ///
    /// On success the results are stored, the session moves to `results` and
    /// the completion event fires if it has not yet. On failure, or when no
    /// condition matches, the error is recorded and the step is unchanged.
    async fn submit_diagnosis(&self) -> Result<Vec<DiseaseMatch>> {
        let phenotype_ids = self.store.snapshot().await.all_phenotype_ids();
        if phenotype_ids.is_empty() {
            return Err(self
                .fail(MedicheckError::invalid_transition(
                    "No symptoms selected for diagnosis",
                ))
                .await);
        }

        tracing::info!(
            "[Orchestrator] Submitting {} phenotypes for diagnosis",
            phenotype_ids.len()
        );
        self.store.dispatch(DecisionGraphAction::ClearError).await;
        self.store
            .dispatch(DecisionGraphAction::SetLoading { loading: true })
            .await;

        let results = match self
            .bounded("disease matching", self.ontology.match_diseases(&phenotype_ids))
            .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!("[Orchestrator] Diagnosis failed: {}", e);
                return Err(self.fail(e).await);
            }
        };

        if results.is_empty() {
            return Err(self
                .fail(MedicheckError::submission(
                    "No matching conditions found for the selected symptoms",
                ))
                .await);
        }

        self.store
            .dispatch(DecisionGraphAction::diagnosis_results(results.clone()))
            .await;
        self.store
            .dispatch(DecisionGraphAction::SetStep {
                step: Step::Results,
            })
            .await;
        let state = self
            .store
            .dispatch(DecisionGraphAction::SetLoading { loading: false })
            .await;
        tracing::info!("[Orchestrator] {} diagnosis results", results.len());

        self.complete(&state).await;
        Ok(results)
    }

    /// Fires the completion event once per session.
    async fn complete(&self, state: &DecisionGraphState) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        let session_id = self.session_id().await;

        if let Some(sink) = &self.consultations {
            let record = ConsultationRecord::from_state(session_id.clone(), state);
            if let Err(e) = sink.save(&record).await {
                tracing::error!("[Orchestrator] Failed to save consultation {}: {}", session_id, e);
                self.store
                    .dispatch(DecisionGraphAction::error(format!(
                        "Failed to save consultation: {}",
                        e
                    )))
                    .await;
            }
        }

        if let Some(navigation) = &self.navigation {
            navigation.on_complete(&session_id, &state.diagnosis_results);
        }
    }

    // ============================================================================
    // Chat
    // ============================================================================

    /// Sends a follow-up question about the results and records both sides of
    /// the exchange. Sending from `results` moves the session to `chat`.
    ///
    /// On failure the user message stays in the transcript and the error is recorded.
    pub async fn send_chat_message(&self, content: &str) -> Result<ChatMessage> {
        let chat = self
            .chat
            .clone()
            .ok_or_else(|| MedicheckError::config("No chat service configured"))?;

        let state = self.store.snapshot().await;
        if !state.has_diagnosis() {
            return Err(MedicheckError::invalid_transition(
                "Chat is available once diagnosis results exist",
            ));
        }
        match state.current_step {
            Step::Chat => {}
            Step::Results => self.set_step(Step::Chat).await,
            other => {
                return Err(MedicheckError::invalid_transition(format!(
                    "Chat is not available during {}",
                    other
                )));
            }
        }

        let request = ChatRequest::for_session(&state, content);
        self.store
            .dispatch(DecisionGraphAction::AddChatMessage {
                message: ChatMessage::user(content),
            })
            .await;
        self.store
            .dispatch(DecisionGraphAction::SetLoading { loading: true })
            .await;

        match self.bounded("chat", chat.ask(request)).await {
            Ok(reply) => {
                let message = ChatMessage::assistant(reply.response);
                self.store
                    .dispatch(DecisionGraphAction::AddChatMessage {
                        message: message.clone(),
                    })
                    .await;
                self.store
                    .dispatch(DecisionGraphAction::SetLoading { loading: false })
                    .await;
                Ok(message)
            }
            Err(e) => {
                tracing::warn!("[Orchestrator] Chat failed: {}", e);
                Err(self.fail(e).await)
            }
        }
    }

    // ============================================================================
    // Lifecycle
    // ============================================================================

    /// Starts over: clears the state, abandons any refinement in flight and
    /// re-arms the completion event under a new session id.
    pub async fn reset(&self) -> DecisionGraphState {
        self.close_refinement().await;
        let state = self.store.dispatch(DecisionGraphAction::Reset).await;
        *self.session_id.write().await = Uuid::new_v4().to_string();
        self.completed.store(false, Ordering::SeqCst);
        tracing::info!("[Orchestrator] Session reset");
        state
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        let limit = self.settings.request_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(MedicheckError::timeout(operation, limit.as_secs())))
    }

    /// Records `err` as the session error and hands it back.
    async fn fail(&self, err: MedicheckError) -> MedicheckError {
        self.store
            .dispatch(DecisionGraphAction::error(err.to_string()))
            .await;
        err
    }
}
