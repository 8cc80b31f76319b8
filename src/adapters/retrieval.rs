//! Evidence retrieval adapters.
//!
//! `HttpRetriever` calls a search/fetch service that already evaluates stance.
//! `StaticRetriever` serves candidates from a JSON fixture for offline runs.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{EvidenceRetriever, RetrievalRequest};
use crate::domain::CandidateSource;

/// Retriever backed by an HTTP search service
pub struct HttpRetriever {
    endpoint: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<CandidateSource>,
}

impl HttpRetriever {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl EvidenceRetriever for HttpRetriever {
    fn name(&self) -> &str {
        "http-retriever"
    }

    async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<CandidateSource>> {
        let response = self
            .client
            .post(&self.endpoint)
            .timeout(request.timeout)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to retrieve evidence for {}", request.claim_id))?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Retrieval service returned {} for {}", status, request.claim_id);
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse retrieval response")?;

        let mut results = parsed.results;
        results.truncate(request.max_results);
        Ok(results)
    }
}

/// Fixture format for `StaticRetriever`
///
/// ```json
/// { "by_claim": { "claim-1": [ ... ] }, "default": [ ... ] }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvidenceFixture {
    #[serde(default)]
    pub by_claim: HashMap<String, Vec<CandidateSource>>,
    /// Served to claims with no entry of their own
    #[serde(default)]
    pub default: Vec<CandidateSource>,
}

/// Retriever answering from an in-memory fixture
#[derive(Debug, Clone, Default)]
pub struct StaticRetriever {
    fixture: EvidenceFixture,
}

impl StaticRetriever {
    pub fn new(fixture: EvidenceFixture) -> Self {
        Self { fixture }
    }

    /// Same candidates for every claim
    pub fn uniform(candidates: Vec<CandidateSource>) -> Self {
        Self::new(EvidenceFixture {
            by_claim: HashMap::new(),
            default: candidates,
        })
    }

    pub fn with_claim(mut self, claim_id: impl Into<String>, candidates: Vec<CandidateSource>) -> Self {
        self.fixture.by_claim.insert(claim_id.into(), candidates);
        self
    }

    /// Load a fixture file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read evidence fixture: {}", path.display()))?;
        let fixture = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse evidence fixture: {}", path.display()))?;
        Ok(Self::new(fixture))
    }
}

#[async_trait]
impl EvidenceRetriever for StaticRetriever {
    fn name(&self) -> &str {
        "static-retriever"
    }

    async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<CandidateSource>> {
        let candidates = self
            .fixture
            .by_claim
            .get(&request.claim_id)
            .unwrap_or(&self.fixture.default);

        Ok(candidates.iter().take(request.max_results).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn candidate(url: &str) -> CandidateSource {
        CandidateSource {
            url: url.to_string(),
            title: String::new(),
            summary: String::new(),
            provider: String::new(),
            published_at: None,
            reliability: 0.5,
            stance_evaluation: Default::default(),
        }
    }

    fn request(claim_id: &str, max_results: usize) -> RetrievalRequest {
        RetrievalRequest {
            topic: "topic".to_string(),
            claim_id: claim_id.to_string(),
            claim_text: "text".to_string(),
            max_results,
            timeout: Duration::from_secs(1),
        }
    }

    #[tokio::test]
    async fn test_static_retriever_prefers_claim_entry() {
        let retriever = StaticRetriever::uniform(vec![candidate("https://a.com")])
            .with_claim("claim-2", vec![candidate("https://b.com"), candidate("https://c.com")]);

        let first = retriever.retrieve(&request("claim-1", 10)).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].url, "https://a.com");

        let second = retriever.retrieve(&request("claim-2", 1)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].url, "https://b.com");
    }

    #[test]
    fn test_fixture_parsing() {
        let json = r#"{
            "default": [
                {
                    "url": "https://www.who.int/report",
                    "title": "Report",
                    "provider": "WHO",
                    "published_at": "2024-03-01T00:00:00Z",
                    "reliability": 0.9,
                    "stance_evaluation": { "stance": "supports", "relevance": 0.8 }
                }
            ]
        }"#;
        let fixture: EvidenceFixture = serde_json::from_str(json).unwrap();
        assert_eq!(fixture.default.len(), 1);
        assert_eq!(fixture.default[0].summary, "");
        assert_eq!(
            fixture.default[0].stance_evaluation.stance,
            crate::domain::Stance::Supports
        );
    }
}
