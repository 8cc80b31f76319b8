//! Stage 3: typed claims to a deduplicated evidence graph.
//!
//! Retrieval runs one request per claim through a bounded pool. Candidates are
//! merged by URL across claims (claim ids are unioned on collision), typed by
//! the heuristic pass, and any node still `unknown` is batched to the remote
//! source classifier through the same bounded pool.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::adapters::{EvidenceRetriever, RetrievalRequest};
use crate::domain::{compute_hash, CandidateSource, EvidenceGraph, EvidenceNode, SourceType, TypedClaim};

use super::fallback::within_timeout;
use super::sources::{heuristic_traits, hostname_of, SourceClassifier, SourceDescriptor};

/// Tuning for stage 3
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSettings {
    /// Simultaneous collaborator calls (default: 2)
    pub concurrency: usize,
    /// Candidates requested per claim (default: 8)
    pub max_results_per_claim: usize,
    pub retrieval_timeout: Duration,
    pub classifier_timeout: Duration,
    /// Unknown nodes per remote classification request (default: 10)
    pub source_batch_size: usize,
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            concurrency: 2,
            max_results_per_claim: 8,
            retrieval_timeout: Duration::from_secs(20),
            classifier_timeout: Duration::from_secs(15),
            source_batch_size: 10,
        }
    }
}

/// Result of stage 3
#[derive(Debug, Clone)]
pub struct GraphOutcome {
    pub graph: EvidenceGraph,
    /// Raw candidates before dedup
    pub candidate_count: usize,
    /// Claims whose retrieval failed or timed out
    pub failed_retrievals: usize,
    /// Nodes typed by the remote classifier
    pub remotely_typed: usize,
}

pub struct EvidenceGraphBuilder {
    retriever: Arc<dyn EvidenceRetriever>,
    source_classifier: Option<Arc<dyn SourceClassifier>>,
    settings: GraphSettings,
}

impl EvidenceGraphBuilder {
    pub fn new(retriever: Arc<dyn EvidenceRetriever>, settings: GraphSettings) -> Self {
        Self {
            retriever,
            source_classifier: None,
            settings,
        }
    }

    pub fn with_source_classifier(mut self, classifier: Arc<dyn SourceClassifier>) -> Self {
        self.source_classifier = Some(classifier);
        self
    }

    #[instrument(skip(self, claims), fields(claims = claims.len()))]
    pub async fn build(&self, claims: &[TypedClaim], topic: &str) -> GraphOutcome {
        let limit = self.settings.concurrency.max(1);

        // buffered (not buffer_unordered) keeps results in claim order
        let retrieved: Vec<(String, Option<Vec<CandidateSource>>)> =
            stream::iter(claims.iter().map(|claim| {
                let request = RetrievalRequest {
                    topic: topic.to_string(),
                    claim_id: claim.id().to_string(),
                    claim_text: claim.claim.text.clone(),
                    max_results: self.settings.max_results_per_claim,
                    timeout: self.settings.retrieval_timeout,
                };
                async move {
                    let answer = within_timeout(
                        self.retriever.name(),
                        request.timeout,
                        self.retriever.retrieve(&request),
                    )
                    .await;
                    (request.claim_id, answer)
                }
            }))
            .buffered(limit)
            .collect()
            .await;

        let failed_retrievals = retrieved.iter().filter(|(_, r)| r.is_none()).count();
        if failed_retrievals > 0 {
            warn!(failed_retrievals, "Some claims proceed without evidence");
        }

        let per_claim: Vec<(String, Vec<CandidateSource>)> = retrieved
            .into_iter()
            .map(|(id, answer)| (id, answer.unwrap_or_default()))
            .collect();
        let candidate_count = per_claim.iter().map(|(_, c)| c.len()).sum();

        let mut nodes = merge_candidates(per_claim);
        let remotely_typed = self.classify_unknown(&mut nodes).await;

        let graph = EvidenceGraph::new(nodes);
        info!(
            candidates = candidate_count,
            nodes = graph.stats.total_sources,
            hostnames = graph.stats.unique_hostnames,
            "Evidence graph built"
        );

        GraphOutcome {
            graph,
            candidate_count,
            failed_retrievals,
            remotely_typed,
        }
    }

    /// Second typing pass; returns how many nodes were updated
    async fn classify_unknown(&self, nodes: &mut [EvidenceNode]) -> usize {
        let Some(ref classifier) = self.source_classifier else {
            return 0;
        };

        let unknown: Vec<SourceDescriptor> = nodes
            .iter()
            .filter(|n| n.source_type == SourceType::Unknown)
            .map(SourceDescriptor::from)
            .collect();
        if unknown.is_empty() {
            return 0;
        }

        let batch_size = self.settings.source_batch_size.max(1);
        let answers: Vec<_> = stream::iter(unknown.chunks(batch_size).map(|batch| {
            within_timeout(
                classifier.name(),
                self.settings.classifier_timeout,
                classifier.classify(batch),
            )
        }))
        .buffered(self.settings.concurrency.max(1))
        .collect()
        .await;

        let typed: HashMap<String, SourceType> = answers
            .into_iter()
            .flatten()
            .flatten()
            .map(|t| (t.id, t.source_type))
            .collect();

        let mut updated = 0;
        for node in nodes.iter_mut() {
            if let Some(source_type) = typed.get(&node.id) {
                if node.source_type == SourceType::Unknown && *source_type != SourceType::Unknown {
                    node.source_type = *source_type;
                    updated += 1;
                }
            }
        }
        debug!(unknown = unknown.len(), updated, "Remote source typing applied");
        updated
    }
}

/// Stable node id derived from the URL
pub fn node_id(url: &str) -> String {
    let hash = compute_hash(url.as_bytes());
    format!("ev-{}", &hash["sha256:".len().."sha256:".len() + 12])
}

/// Merge per-claim candidates into URL-unique nodes with heuristic typing.
///
/// The first occurrence of a URL fixes the node's content; later occurrences
/// only add their claim id.
pub fn merge_candidates(per_claim: Vec<(String, Vec<CandidateSource>)>) -> Vec<EvidenceNode> {
    let mut nodes: Vec<EvidenceNode> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (claim_id, candidates) in per_claim {
        for candidate in candidates {
            let url = candidate.url.trim().to_string();
            if url.is_empty() {
                continue;
            }

            if let Some(&i) = index.get(&url) {
                nodes[i].claim_ids.insert(claim_id.clone());
                continue;
            }

            let mut node = EvidenceNode {
                id: node_id(&url),
                hostname: hostname_of(&url),
                provider: candidate.provider,
                title: candidate.title,
                summary: candidate.summary,
                published_at: candidate.published_at,
                source_type: SourceType::Unknown,
                is_peer_reviewed: false,
                is_institutional: false,
                reliability: candidate.reliability.clamp(0.0, 1.0),
                relevance: candidate.stance_evaluation.relevance.clamp(0.0, 1.0),
                stance: candidate.stance_evaluation.stance,
                claim_ids: BTreeSet::from([claim_id.clone()]),
                url: url.clone(),
            };
            let traits = heuristic_traits(&node);
            node.source_type = traits.source_type;
            node.is_peer_reviewed = traits.is_peer_reviewed;
            node.is_institutional = traits.is_institutional;

            index.insert(url, nodes.len());
            nodes.push(node);
        }
    }

    nodes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Stance, StanceEvaluation};

    fn candidate(url: &str, stance: Stance) -> CandidateSource {
        CandidateSource {
            url: url.to_string(),
            title: "Title".to_string(),
            summary: String::new(),
            provider: String::new(),
            published_at: None,
            reliability: 1.4,
            stance_evaluation: StanceEvaluation {
                stance,
                relevance: 0.7,
            },
        }
    }

    #[test]
    fn test_merge_unions_claim_ids() {
        let nodes = merge_candidates(vec![
            (
                "claim-1".to_string(),
                vec![
                    candidate("https://a.com/x", Stance::Supports),
                    candidate("https://b.com/y", Stance::Refutes),
                ],
            ),
            (
                "claim-2".to_string(),
                vec![candidate("https://a.com/x", Stance::Refutes)],
            ),
        ]);

        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].claim_ids.len(), 2);
        assert!(nodes[0].serves("claim-2"));
        // first occurrence wins
        assert_eq!(nodes[0].stance, Stance::Supports);
        // reliability is clamped
        assert_eq!(nodes[0].reliability, 1.0);
    }

    #[test]
    fn test_node_id_is_stable() {
        assert_eq!(node_id("https://a.com/x"), node_id("https://a.com/x"));
        assert_ne!(node_id("https://a.com/x"), node_id("https://a.com/y"));
        assert_eq!(node_id("https://a.com/x").len(), "ev-".len() + 12);
    }

    #[test]
    fn test_blank_urls_skipped() {
        let nodes = merge_candidates(vec![(
            "claim-1".to_string(),
            vec![candidate("  ", Stance::Supports)],
        )]);
        assert!(nodes.is_empty());
    }
}
