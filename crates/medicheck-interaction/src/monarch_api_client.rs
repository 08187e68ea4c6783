//! MonarchApiClient - REST client for the Monarch knowledge graph proxy.
//!
//! Endpoints used:
//! - `GET  /search` for term search
//! - `GET  /hpo/{id}/children` for hierarchy descent during refinement
//! - `POST /phenotype/profile-search` for semantic disease matching
//! - `POST /chat` for post-diagnosis questions

use crate::wire::{
    ChatResponse, HUMAN_DISEASES, ProfileSearchRequest, ProfileSearchResponse, SearchResponse,
    to_disease_matches,
};
use async_trait::async_trait;
use medicheck_core::chat::{ChatReply, ChatRequest, ChatService};
use medicheck_core::config::{DEFAULT_MATCH_LIMIT, DEFAULT_TIMEOUT_SECS, MedicheckConfig};
use medicheck_core::diagnosis::{DiseaseMatch, UrgencyPolicy};
use medicheck_core::error::{MedicheckError, Result};
use medicheck_core::ontology::{ChildAssociation, ChildrenPage, OntologyClient, SimilarityMetric};
use medicheck_core::phenotype::OntologyTerm;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Client for the Monarch REST proxy.
#[derive(Clone)]
pub struct MonarchApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    match_limit: usize,
    metric: SimilarityMetric,
    score_ceiling: f64,
    urgency: UrgencyPolicy,
}

impl MonarchApiClient {
    /// Creates a client for `base_url` with default limits and metric.
    pub fn new(base_url: impl Into<String>) -> Self {
        let metric = SimilarityMetric::default();
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            match_limit: DEFAULT_MATCH_LIMIT,
            metric,
            score_ceiling: metric.default_score_ceiling(),
            urgency: UrgencyPolicy::default(),
        }
    }

    /// Creates a client from the loaded configuration.
    pub fn from_config(config: &MedicheckConfig) -> Self {
        Self::new(&config.ontology.base_url)
            .with_timeout(config.ontology.timeout())
            .with_match_limit(config.ontology.match_limit)
            .with_metric(config.ontology.metric, config.ontology.score_ceiling())
            .with_urgency_policy(config.urgency)
    }

    /// Sets the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of disease matches requested.
    pub fn with_match_limit(mut self, limit: usize) -> Self {
        self.match_limit = limit;
        self
    }

    /// Sets the similarity metric and the raw score that maps to a perfect match.
    pub fn with_metric(mut self, metric: SimilarityMetric, score_ceiling: f64) -> Self {
        self.metric = metric;
        self.score_ceiling = score_ceiling;
        self
    }

    pub fn with_urgency_policy(mut self, policy: UrgencyPolicy) -> Self {
        self.urgency = policy;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        request.timeout(self.timeout).send().await.map_err(|e| {
            if e.is_timeout() {
                MedicheckError::timeout(operation, self.timeout.as_secs())
            } else {
                MedicheckError::transport(format!("{} request failed: {}", operation, e))
            }
        })
    }

    /// Maps a non-success status: 404 becomes `NotFound` for `entity`, anything
    /// else `Transport` with the response body.
    async fn check_status(
        operation: &str,
        entity: (&'static str, &str),
        response: Response,
    ) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(MedicheckError::not_found(entity.0, entity.1));
        }
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(MedicheckError::transport(format!(
            "{} failed ({}): {}",
            operation, status, error_text
        )))
    }

    async fn parse<T: DeserializeOwned>(operation: &str, response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| MedicheckError::Serialization {
            format: "JSON".to_string(),
            message: format!("Failed to parse {} response: {}", operation, e),
        })
    }
}

#[async_trait]
impl OntologyClient for MonarchApiClient {
    async fn search_terms(
        &self,
        query: &str,
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<OntologyTerm>> {
        let mut params: Vec<(&str, String)> =
            vec![("query", query.to_string()), ("limit", limit.to_string())];
        if let Some(category) = category {
            params.push(("category", category.to_string()));
        }

        tracing::debug!("[MonarchApiClient] search query={:?} category={:?}", query, category);
        let request = self.client.get(self.url("search")).query(&params);
        let response = self.send("term search", request).await?;
        let response = Self::check_status("term search", ("search", query), response).await?;
        let body: SearchResponse = Self::parse("term search", response).await?;

        Ok(body.items.into_iter().map(|item| item.into_term()).collect())
    }

    async fn get_children(&self, term_id: &str, limit: usize) -> Result<Vec<ChildAssociation>> {
        tracing::debug!("[MonarchApiClient] children term_id={} limit={}", term_id, limit);
        let request = self
            .client
            .get(self.url(&format!("hpo/{}/children", term_id)))
            .query(&[("limit", limit.to_string())]);
        let response = self.send("child lookup", request).await?;
        let response = Self::check_status("child lookup", ("ontology term", term_id), response).await?;
        let page: ChildrenPage = Self::parse("child lookup", response).await?;

        tracing::debug!(
            "[MonarchApiClient] term_id={} returned {} children",
            term_id,
            page.children.len()
        );
        Ok(page.children)
    }

    async fn match_diseases(&self, phenotype_ids: &[String]) -> Result<Vec<DiseaseMatch>> {
        if phenotype_ids.is_empty() {
            return Ok(Vec::new());
        }

        let body = ProfileSearchRequest {
            phenotype_ids,
            search_group: HUMAN_DISEASES,
            metric: self.metric,
            limit: self.match_limit,
        };
        tracing::info!(
            "[MonarchApiClient] profile search with {} phenotypes (metric={})",
            phenotype_ids.len(),
            self.metric
        );
        let request = self.client.post(self.url("phenotype/profile-search")).json(&body);
        let response = self.send("disease matching", request).await?;
        let profile = phenotype_ids.join(",");
        let response =
            Self::check_status("disease matching", ("profile", profile.as_str()), response).await?;
        let raw: ProfileSearchResponse = Self::parse("disease matching", response).await?;

        Ok(to_disease_matches(
            raw.into_matches(),
            phenotype_ids,
            self.score_ceiling,
            &self.urgency,
        ))
    }
}

#[async_trait]
impl ChatService for MonarchApiClient {
    async fn ask(&self, request: ChatRequest) -> Result<ChatReply> {
        tracing::debug!(
            "[MonarchApiClient] chat with {} history messages",
            request.history.len()
        );
        let builder = self.client.post(self.url("chat")).json(&request);
        let response = self.send("chat", builder).await?;
        let response = Self::check_status("chat", ("chat endpoint", "/chat"), response).await?;
        let body: ChatResponse = Self::parse("chat", response).await?;

        Ok(ChatReply {
            response: body.response,
            sources: body.sources.unwrap_or_default(),
        })
    }
}
