//! HTTP implementations of the MediCheck collaborator traits.
//!
//! `MonarchApiClient` talks to the Monarch REST proxy and implements both
//! `OntologyClient` (term search, hierarchy traversal, disease matching) and
//! `ChatService` (post-diagnosis Q&A).

mod monarch_api_client;
mod wire;

pub use monarch_api_client::MonarchApiClient;
