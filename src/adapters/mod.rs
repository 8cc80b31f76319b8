//! Adapter interfaces for external collaborators.
//!
//! The engine talks to exactly two outside systems:
//! - a language model, used for claim parsing, claim typing and source typing
//! - an evidence retriever, returning candidate sources for a claim
//!
//! Callers wrap every adapter call in a timeout and fall back to local
//! heuristics on any error, so adapters may fail freely.

pub mod llm;
pub mod retrieval;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::CandidateSource;

pub use llm::HttpLanguageModel;
pub use retrieval::{HttpRetriever, StaticRetriever};

/// A single system + user prompt exchange
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Language-understanding collaborator
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Human-readable adapter name
    fn name(&self) -> &str;

    /// Return the model's raw text answer, expected to be JSON
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}

/// Request sent to the evidence retrieval collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalRequest {
    pub topic: String,
    pub claim_id: String,
    pub claim_text: String,
    pub max_results: usize,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
}

/// Evidence retrieval collaborator
#[async_trait]
pub trait EvidenceRetriever: Send + Sync {
    fn name(&self) -> &str;

    /// Candidate sources for one claim; an empty list is a valid answer
    async fn retrieve(&self, request: &RetrievalRequest) -> Result<Vec<CandidateSource>>;
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// Pull the first JSON object or array out of a model answer.
///
/// Models often wrap JSON in prose or code fences.
pub fn extract_json(raw: &str) -> Option<&str> {
    let start = raw.find(|c: char| c == '{' || c == '[')?;
    let close = if raw[start..].starts_with('{') { '}' } else { ']' };
    let end = raw.rfind(close)?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_answer() {
        let raw = "Here you go:\n```json\n{\"a\": [1, 2]}\n```";
        assert_eq!(extract_json(raw), Some("{\"a\": [1, 2]}"));
    }

    #[test]
    fn test_extract_json_missing() {
        assert_eq!(extract_json("no json here"), None);
    }

    #[test]
    fn test_retrieval_request_serializes_timeout_as_millis() {
        let request = RetrievalRequest {
            topic: "climate".to_string(),
            claim_id: "claim-1".to_string(),
            claim_text: "Seas are rising".to_string(),
            max_results: 5,
            timeout: Duration::from_secs(2),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["timeout"], 2000);
    }
}
