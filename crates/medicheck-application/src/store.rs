//! Single-writer container for the decision graph state.

use medicheck_core::decision_graph::{DecisionGraphAction, DecisionGraphState, reduce, replay};
use medicheck_core::error::{MedicheckError, Result};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

struct StoreInner {
    state: DecisionGraphState,
    /// Actions applied since the last reset, in order
    history: Vec<DecisionGraphAction>,
    /// Identity of the refinement pass whose fetch results may still be applied
    refinement_token: Option<Uuid>,
}

/// Holds one session's `DecisionGraphState`.
///
/// All transitions go through [`dispatch`](Self::dispatch), which applies the
/// pure `reduce` under the write lock, so no two transitions ever interleave.
/// Clones share the same state.
#[derive(Clone)]
pub struct DecisionGraphStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl DecisionGraphStore {
    /// Creates a store holding the initial state.
    pub fn new() -> Self {
        Self::with_state(DecisionGraphState::default())
    }

    pub fn with_state(state: DecisionGraphState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner {
                state,
                history: Vec::new(),
                refinement_token: None,
            })),
        }
    }

    /// Applies `action` and returns the resulting state.
    pub async fn dispatch(&self, action: DecisionGraphAction) -> DecisionGraphState {
        let mut inner = self.inner.write().await;
        Self::apply(&mut inner, action)
    }

    /// Applies `action` only while `token` is the current refinement token.
    ///
    /// Returns `None` when the action was discarded.
    pub async fn dispatch_if_current(
        &self,
        token: Uuid,
        action: DecisionGraphAction,
    ) -> Option<DecisionGraphState> {
        let mut inner = self.inner.write().await;
        if inner.refinement_token != Some(token) {
            tracing::debug!(
                "[DecisionGraphStore] Discarding stale {} from refinement {}",
                action.kind(),
                token
            );
            return None;
        }
        Some(Self::apply(&mut inner, action))
    }

    /// Applies an action addressed to the refinement question of
    /// `phenotype_id`, while `token` is current.
    ///
    /// The question's index is resolved under the same write lock the action
    /// is applied under, so a concurrent removal cannot redirect the action to
    /// another question. Returns the resolved index with the new state.
    pub async fn dispatch_for_question<F>(
        &self,
        token: Uuid,
        phenotype_id: &str,
        build: F,
    ) -> Result<(usize, DecisionGraphState)>
    where
        F: FnOnce(usize) -> DecisionGraphAction,
    {
        let mut inner = self.inner.write().await;
        if inner.refinement_token != Some(token) {
            tracing::debug!(
                "[DecisionGraphStore] Discarding action on {} from stale refinement {}",
                phenotype_id,
                token
            );
            return Err(MedicheckError::invalid_transition(
                "Refinement session is no longer active",
            ));
        }
        let position = inner
            .state
            .refinement_questions
            .iter()
            .position(|q| q.phenotype_id == phenotype_id)
            .ok_or_else(|| {
                MedicheckError::invalid_transition(format!(
                    "{} is no longer being refined",
                    phenotype_id
                ))
            })?;
        let state = Self::apply(&mut inner, build(position));
        Ok((position, state))
    }

    fn apply(inner: &mut StoreInner, action: DecisionGraphAction) -> DecisionGraphState {
        tracing::debug!("[DecisionGraphStore] {}", action.kind());
        inner.state = reduce(&inner.state, &action);
        // A reset starts a new session; the old one's log goes with it.
        if matches!(action, DecisionGraphAction::Reset) {
            inner.history.clear();
        }
        inner.history.push(action);
        inner.state.clone()
    }

    /// Returns a copy of the current state.
    pub async fn snapshot(&self) -> DecisionGraphState {
        self.inner.read().await.state.clone()
    }

    /// Starts a new refinement pass, invalidating any previous one.
    pub async fn begin_refinement(&self) -> Uuid {
        let token = Uuid::new_v4();
        self.inner.write().await.refinement_token = Some(token);
        token
    }

    /// Invalidates the current refinement pass, if any.
    pub async fn end_refinement(&self) {
        self.inner.write().await.refinement_token = None;
    }

    pub async fn is_current(&self, token: Uuid) -> bool {
        self.inner.read().await.refinement_token == Some(token)
    }

    /// The action log since the last reset, oldest first.
    ///
    /// Starts with `Reset` once the store has been reset.
    pub async fn history(&self) -> Vec<DecisionGraphAction> {
        self.inner.read().await.history.clone()
    }

    /// Rebuilds a state from an action log.
    pub fn replay(actions: &[DecisionGraphAction]) -> DecisionGraphState {
        replay(actions)
    }
}

impl Default for DecisionGraphStore {
    fn default() -> Self {
        Self::new()
    }
}
