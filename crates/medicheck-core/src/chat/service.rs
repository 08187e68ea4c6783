//! Chat service trait.

use super::message::{ChatMessage, ChatRole};
use crate::decision_graph::DecisionGraphState;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Number of top diagnosis results sent as context.
const CONTEXT_RESULTS: usize = 5;
/// Number of most recent transcript messages sent as history.
const HISTORY_WINDOW: usize = 10;

/// Condensed view of one diagnosis result for the assistant's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub id: String,
    pub name: String,
    pub confidence: u8,
}

/// History entry in the wire shape the chat endpoint expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: ChatRole,
    pub content: String,
}

/// A follow-up question about the current diagnosis results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub phenotypes: Vec<String>,
    #[serde(default)]
    pub diagnosis_results: Vec<ResultSummary>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl ChatRequest {
    /// Builds a request from the session state.
    ///
    /// `history` is taken from the transcript as it is in `state`, so callers
    /// build the request before appending the new user message.
    pub fn for_session(state: &DecisionGraphState, message: impl Into<String>) -> Self {
        let history_start = state.chat_messages.len().saturating_sub(HISTORY_WINDOW);
        Self {
            message: message.into(),
            phenotypes: state.all_phenotype_ids(),
            diagnosis_results: state
                .diagnosis_results
                .iter()
                .take(CONTEXT_RESULTS)
                .map(|m| ResultSummary {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    confidence: m.confidence,
                })
                .collect(),
            history: state.chat_messages[history_start..]
                .iter()
                .map(|m: &ChatMessage| HistoryEntry {
                    role: m.role,
                    content: m.content.clone(),
                })
                .collect(),
        }
    }
}

/// The assistant's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Answers follow-up questions about diagnosis results.
#[async_trait]
pub trait ChatService: Send + Sync {
    async fn ask(&self, request: ChatRequest) -> Result<ChatReply>;
}
