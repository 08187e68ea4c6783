//! Post-diagnosis chat module.
//!
//! - `message`: transcript entries (`ChatRole`, `ChatMessage`)
//! - `service`: the chat collaborator trait and its request/response types

mod message;
mod service;

pub use message::{ChatMessage, ChatRole};
pub use service::{ChatReply, ChatRequest, ChatService, HistoryEntry, ResultSummary};
