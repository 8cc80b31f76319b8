//! Evidence nodes and the deduplicated evidence graph.
//!
//! The graph's `stats` are a projection of its `nodes`. They are computed once
//! at construction and can be recomputed at any time to check they still match.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of source an evidence node comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Empirical,
    ModelBased,
    MetaAnalysis,
    InstitutionalConsensus,
    NewsReport,
    Opinion,
    Unknown,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empirical => "empirical",
            Self::ModelBased => "model_based",
            Self::MetaAnalysis => "meta_analysis",
            Self::InstitutionalConsensus => "institutional_consensus",
            Self::NewsReport => "news_report",
            Self::Opinion => "opinion",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "empirical" => Some(Self::Empirical),
            "model_based" => Some(Self::ModelBased),
            "meta_analysis" => Some(Self::MetaAnalysis),
            "institutional_consensus" => Some(Self::InstitutionalConsensus),
            "news_report" => Some(Self::NewsReport),
            "opinion" => Some(Self::Opinion),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Direct observation rather than projection or commentary
    pub fn is_empirical(&self) -> bool {
        matches!(self, Self::Empirical | Self::MetaAnalysis)
    }
}

/// A source's relationship to the claim it was retrieved for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    Supports,
    Refutes,
    Mixed,
    Unclear,
    Irrelevant,
}

impl Default for Stance {
    fn default() -> Self {
        Self::Unclear
    }
}

/// Stance judgement attached to a retrieved candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StanceEvaluation {
    pub stance: Stance,
    pub relevance: f64,
}

impl Default for StanceEvaluation {
    fn default() -> Self {
        Self {
            stance: Stance::Unclear,
            relevance: 0.0,
        }
    }
}

/// Raw candidate returned by the retrieval collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSource {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default = "default_reliability")]
    pub reliability: f64,
    #[serde(default)]
    pub stance_evaluation: StanceEvaluation,
}

fn default_reliability() -> f64 {
    0.5
}

/// One deduplicated source, possibly serving several claims
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceNode {
    pub id: String,
    /// Dedup key: no two nodes in a graph share a URL
    pub url: String,
    pub hostname: String,
    pub provider: String,
    pub title: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    pub source_type: SourceType,
    pub is_peer_reviewed: bool,
    pub is_institutional: bool,
    pub reliability: f64,
    pub relevance: f64,
    pub stance: Stance,
    pub claim_ids: BTreeSet<String>,
}

impl EvidenceNode {
    /// Title and summary, the text detectors match against
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.summary)
    }

    pub fn supports(&self) -> bool {
        self.stance == Stance::Supports
    }

    pub fn refutes(&self) -> bool {
        self.stance == Stance::Refutes
    }

    pub fn is_model_based(&self) -> bool {
        self.source_type == SourceType::ModelBased
    }

    pub fn is_expert(&self) -> bool {
        self.is_peer_reviewed || self.is_institutional
    }

    pub fn serves(&self, claim_id: &str) -> bool {
        self.claim_ids.contains(claim_id)
    }
}

/// Aggregate statistics over a graph's nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphStats {
    pub total_sources: usize,
    pub unique_hostnames: usize,
    pub hostname_distribution: BTreeMap<String, usize>,
    /// True iff one hostname accounts for more than half of all nodes
    pub single_source_dominance: bool,
    pub dominant_hostname: Option<String>,
    pub source_type_distribution: BTreeMap<SourceType, usize>,
    pub average_reliability: f64,
    pub peer_reviewed_count: usize,
    pub institutional_count: usize,
    pub model_based_count: usize,
    pub supporting_count: usize,
    pub refuting_count: usize,
    pub oldest_evidence: Option<DateTime<Utc>>,
    pub newest_evidence: Option<DateTime<Utc>>,
}

/// Share above which a single hostname dominates the evidence
pub const DOMINANCE_THRESHOLD: f64 = 0.5;

impl GraphStats {
    pub fn compute(nodes: &[EvidenceNode]) -> Self {
        let total_sources = nodes.len();

        let mut hostname_distribution: BTreeMap<String, usize> = BTreeMap::new();
        let mut source_type_distribution: BTreeMap<SourceType, usize> = BTreeMap::new();
        for node in nodes {
            *hostname_distribution.entry(node.hostname.clone()).or_default() += 1;
            *source_type_distribution.entry(node.source_type).or_default() += 1;
        }

        // Ties resolve to the alphabetically first hostname
        let mut dominant: Option<(&String, usize)> = None;
        for (host, count) in &hostname_distribution {
            if dominant.map_or(true, |(_, best)| *count > best) {
                dominant = Some((host, *count));
            }
        }
        let (single_source_dominance, dominant_hostname) = match dominant {
            Some((host, count)) if count as f64 / total_sources as f64 > DOMINANCE_THRESHOLD => {
                (true, Some(host.clone()))
            }
            _ => (false, None),
        };

        let average_reliability = if total_sources == 0 {
            0.0
        } else {
            nodes.iter().map(|n| n.reliability).sum::<f64>() / total_sources as f64
        };

        let dates = nodes.iter().filter_map(|n| n.published_at);

        Self {
            total_sources,
            unique_hostnames: hostname_distribution.len(),
            single_source_dominance,
            dominant_hostname,
            average_reliability,
            peer_reviewed_count: nodes.iter().filter(|n| n.is_peer_reviewed).count(),
            institutional_count: nodes.iter().filter(|n| n.is_institutional).count(),
            model_based_count: nodes.iter().filter(|n| n.is_model_based()).count(),
            supporting_count: nodes.iter().filter(|n| n.supports()).count(),
            refuting_count: nodes.iter().filter(|n| n.refutes()).count(),
            oldest_evidence: dates.clone().min(),
            newest_evidence: dates.max(),
            hostname_distribution,
            source_type_distribution,
        }
    }

    /// Fraction of nodes that are model-based (0 when empty)
    pub fn model_based_ratio(&self) -> f64 {
        ratio(self.model_based_count, self.total_sources)
    }

    /// Sources with a clear supports/refutes stance
    pub fn stanced_count(&self) -> usize {
        self.supporting_count + self.refuting_count
    }

    pub fn count_of(&self, source_type: SourceType) -> usize {
        self.source_type_distribution
            .get(&source_type)
            .copied()
            .unwrap_or(0)
    }
}

pub(crate) fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Deduplicated evidence for a claim set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceGraph {
    pub nodes: Vec<EvidenceNode>,
    pub stats: GraphStats,
}

impl EvidenceGraph {
    pub fn new(nodes: Vec<EvidenceNode>) -> Self {
        let stats = GraphStats::compute(&nodes);
        Self { nodes, stats }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes linked to a claim, in graph order
    pub fn evidence_for<'a>(&'a self, claim_id: &'a str) -> impl Iterator<Item = &'a EvidenceNode> + 'a {
        self.nodes.iter().filter(move |n| n.serves(claim_id))
    }

    pub fn supporting(&self) -> impl Iterator<Item = &EvidenceNode> {
        self.nodes.iter().filter(|n| n.supports())
    }

    /// Distinct hostnames among supporting nodes
    pub fn supporting_hostnames(&self) -> BTreeSet<&str> {
        self.supporting().map(|n| n.hostname.as_str()).collect()
    }

    /// Whether the stored stats still match the nodes
    pub fn stats_consistent(&self) -> bool {
        GraphStats::compute(&self.nodes) == self.stats
    }

    /// True when every node URL is distinct
    pub fn urls_unique(&self) -> bool {
        let urls: BTreeSet<&str> = self.nodes.iter().map(|n| n.url.as_str()).collect();
        urls.len() == self.nodes.len()
    }
}
