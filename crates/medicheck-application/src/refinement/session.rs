//! One refinement pass over the selected phenotypes.
//!
//! A `RefinementSession` owns a slot per question. Child terms for every slot
//! are fetched concurrently; each completion writes only its own slot, so a
//! slow or failing lookup never affects the others. Selections are never kept
//! locally: toggles, answers and skips are dispatched to the
//! `DecisionGraphStore`, and the selected children are read back from it.

use crate::store::DecisionGraphStore;
use futures::future::join_all;
use medicheck_core::decision_graph::{DecisionGraphAction, DecisionGraphState, RefinementQuestion};
use medicheck_core::error::{MedicheckError, Result};
use medicheck_core::ontology::{ChildAssociation, OntologyClient};
use medicheck_core::phenotype::OntologyTerm;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fetch state of one question's child terms.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildSlot {
    Loading,
    Ready(Vec<OntologyTerm>),
    /// Holds a message suitable for display next to the question
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RefinementItem {
    pub phenotype_id: String,
    pub phenotype_name: String,
    pub slot: ChildSlot,
}

impl RefinementItem {
    fn from_question(question: &RefinementQuestion) -> Self {
        let slot = if question.child_terms.is_empty() {
            ChildSlot::Loading
        } else {
            ChildSlot::Ready(question.child_terms.clone())
        };
        Self {
            phenotype_id: question.phenotype_id.clone(),
            phenotype_name: question.phenotype_name.clone(),
            slot,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.slot, ChildSlot::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.slot {
            ChildSlot::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Loaded children; empty while loading or after a failure.
    pub fn children(&self) -> &[OntologyTerm] {
        match &self.slot {
            ChildSlot::Ready(children) => children,
            _ => &[],
        }
    }

    /// True when the lookup succeeded but the term has no more specific children.
    pub fn has_no_options(&self) -> bool {
        matches!(&self.slot, ChildSlot::Ready(children) if children.is_empty())
    }
}

/// Outcome of answering or skipping the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementProgress {
    /// Moved on to the question at this index
    Advanced(usize),
    /// The last question was handled; refinement is complete
    Exhausted,
}

pub struct RefinementSession {
    client: Arc<dyn OntologyClient>,
    store: DecisionGraphStore,
    token: Uuid,
    children_limit: usize,
    fetch_timeout: Duration,
    items: Arc<RwLock<Vec<RefinementItem>>>,
    current_index: RwLock<usize>,
}

impl RefinementSession {
    /// Creates a session with one slot per question, in question order.
    ///
    /// Questions that already carry child terms start out `Ready`; all
    /// others start `Loading` until [`load_children`](Self::load_children) runs.
    pub fn new(
        client: Arc<dyn OntologyClient>,
        store: DecisionGraphStore,
        token: Uuid,
        questions: &[RefinementQuestion],
        children_limit: usize,
        fetch_timeout: Duration,
    ) -> Self {
        let items = questions.iter().map(RefinementItem::from_question).collect();
        Self {
            client,
            store,
            token,
            children_limit,
            fetch_timeout,
            items: Arc::new(RwLock::new(items)),
            current_index: RwLock::new(0),
        }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    pub async fn items(&self) -> Vec<RefinementItem> {
        self.items.read().await.clone()
    }

    pub async fn item(&self, index: usize) -> Option<RefinementItem> {
        self.items.read().await.get(index).cloned()
    }

    pub async fn current_index(&self) -> usize {
        *self.current_index.read().await
    }

    pub async fn current_item(&self) -> Option<RefinementItem> {
        let index = self.current_index().await;
        self.item(index).await
    }

    /// Fetches children for every slot still `Loading`.
    ///
    /// Fetches run concurrently and are individually bounded by the fetch
    /// timeout. Returns once every fetch has settled. Results arriving after
    /// the session's token was invalidated are dropped.
    pub async fn load_children(&self) {
        let pending: Vec<(usize, String)> = self
            .items
            .read()
            .await
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_loading())
            .map(|(index, item)| (index, item.phenotype_id.clone()))
            .collect();

        let total = self.len().await;
        tracing::debug!(
            "[RefinementSession] Fetching children for {} of {} questions",
            pending.len(),
            total
        );

        join_all(
            pending
                .into_iter()
                .map(|(index, phenotype_id)| self.fetch_slot(index, phenotype_id)),
        )
        .await;
    }

    async fn fetch_slot(&self, index: usize, phenotype_id: String) {
        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.client.get_children(&phenotype_id, self.children_limit),
        )
        .await
        .unwrap_or_else(|_| {
            Err(MedicheckError::timeout(
                format!("children of {}", phenotype_id),
                self.fetch_timeout.as_secs(),
            ))
        });

        let slot = match fetched {
            Ok(associations) => {
                let children: Vec<OntologyTerm> = associations
                    .into_iter()
                    .map(ChildAssociation::into_term)
                    .collect();
                let action = DecisionGraphAction::SetRefinementChildren {
                    phenotype_id: phenotype_id.clone(),
                    children: children.clone(),
                };
                if self.store.dispatch_if_current(self.token, action).await.is_none() {
                    return;
                }
                tracing::debug!(
                    "[RefinementSession] {} has {} children",
                    phenotype_id,
                    children.len()
                );
                ChildSlot::Ready(children)
            }
            Err(e) => {
                if !self.store.is_current(self.token).await {
                    return;
                }
                tracing::warn!(
                    "[RefinementSession] Failed to load children of {}: {}",
                    phenotype_id,
                    e
                );
                ChildSlot::Failed(e.user_message())
            }
        };

        self.write_slot(index, &phenotype_id, slot).await;
    }

    async fn write_slot(&self, index: usize, phenotype_id: &str, slot: ChildSlot) {
        let mut items = self.items.write().await;
        // The item may have been pruned while its fetch was in flight.
        if let Some(item) = items
            .get_mut(index)
            .filter(|item| item.phenotype_id == phenotype_id)
        {
            item.slot = slot;
        }
    }

    /// Moves to the next question; no-op on the last one.
    pub async fn next(&self) -> usize {
        let len = self.len().await;
        let mut current = self.current_index.write().await;
        if *current + 1 < len {
            *current += 1;
        }
        *current
    }

    /// Moves to the previous question; no-op on the first one.
    ///
    /// The aggregate refinement pointer follows the move backwards.
    pub async fn prev(&self) -> Result<usize> {
        let index = {
            let mut current = self.current_index.write().await;
            if *current == 0 {
                return Ok(0);
            }
            *current -= 1;
            *current
        };
        self.dispatch_on(index, |position| DecisionGraphAction::RewindRefinement {
            index: position,
        })
        .await?;
        Ok(index)
    }

    /// Positions the session on the last question and rewinds the aggregate
    /// pointer to it. Used when returning to refinement from the results.
    pub async fn revisit_last(&self) -> Result<Option<usize>> {
        let len = self.len().await;
        if len == 0 {
            return Ok(None);
        }
        *self.current_index.write().await = len - 1;
        self.dispatch_on(len - 1, |position| DecisionGraphAction::RewindRefinement {
            index: position,
        })
        .await?;
        Ok(Some(len - 1))
    }

    /// Selects or deselects `child_id` on the current question.
    ///
    /// Returns whether the child is selected afterwards.
    pub async fn toggle_child(&self, child_id: &str) -> Result<bool> {
        let index = self.current_index().await;
        let (position, state) = self
            .dispatch_on(index, |position| {
                DecisionGraphAction::toggle_child(position, child_id)
            })
            .await?;
        Ok(state
            .refinement_questions
            .get(position)
            .is_some_and(|q| q.selected_child_ids.contains(child_id)))
    }

    /// Children of question `index` currently selected in the aggregate.
    pub async fn selected_children(&self, index: usize) -> BTreeSet<String> {
        let Some(item) = self.item(index).await else {
            return BTreeSet::new();
        };
        self.store
            .snapshot()
            .await
            .question_for(&item.phenotype_id)
            .map(|q| q.selected_child_ids.clone())
            .unwrap_or_default()
    }

    /// Answers the current question with exactly `child_ids` and advances.
    pub async fn answer(&self, child_ids: Vec<String>) -> Result<RefinementProgress> {
        let index = self.current_index().await;
        self.dispatch_on(index, |position| DecisionGraphAction::answer(position, child_ids))
            .await?;
        self.advance_from(index).await
    }

    /// Answers the current question with its current selection.
    pub async fn confirm(&self) -> Result<RefinementProgress> {
        let index = self.current_index().await;
        let selected = self.selected_children(index).await.into_iter().collect();
        self.answer(selected).await
    }

    /// Marks the current question answered without touching its selection, and advances.
    pub async fn skip(&self) -> Result<RefinementProgress> {
        let index = self.current_index().await;
        self.dispatch_on(index, |position| DecisionGraphAction::SkipRefinement {
            index: position,
        })
        .await?;
        self.advance_from(index).await
    }

    async fn advance_from(&self, index: usize) -> Result<RefinementProgress> {
        let len = self.len().await;
        if index + 1 >= len {
            tracing::debug!("[RefinementSession] All {} questions handled", len);
            return Ok(RefinementProgress::Exhausted);
        }
        let mut current = self.current_index.write().await;
        *current = index + 1;
        Ok(RefinementProgress::Advanced(index + 1))
    }

    /// Drops items whose question no longer exists in `state`.
    ///
    /// The current index follows the current item to its new position. If
    /// that item was dropped, the index stays put, clamped to the last item.
    pub async fn sync_with(&self, state: &DecisionGraphState) {
        let mut items = self.items.write().await;
        let mut current = self.current_index.write().await;
        let current_id = items.get(*current).map(|item| item.phenotype_id.clone());

        items.retain(|item| state.question_for(&item.phenotype_id).is_some());
        let index = current_id
            .and_then(|id| items.iter().position(|item| item.phenotype_id == id))
            .unwrap_or_else(|| (*current).min(items.len().saturating_sub(1)));
        *current = index;
    }

    /// Dispatches an action addressed to item `index`'s question, resolving
    /// the question's aggregate position under the store's lock.
    async fn dispatch_on<F>(&self, index: usize, build: F) -> Result<(usize, DecisionGraphState)>
    where
        F: FnOnce(usize) -> DecisionGraphAction,
    {
        let item = self.item(index).await.ok_or_else(|| {
            MedicheckError::invalid_transition(format!("No refinement question at {}", index))
        })?;
        self.store
            .dispatch_for_question(self.token, &item.phenotype_id, build)
            .await
    }
}
