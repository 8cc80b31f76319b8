//! Immutable, versioned, content-hashed stage outputs.
//!
//! Every stage result is sealed into an `Artifact` before the next stage
//! consumes it. The hash covers the serialized payload only, so an artifact
//! can be re-verified after a round trip through storage.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Schema version stamped on every artifact
pub const ARTIFACT_VERSION: &str = "1.0.0";

/// Pipeline stage that produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ClaimParsing,
    ClaimTyping,
    EvidenceGraph,
    FailureModes,
    Scoring,
    Explanation,
}

impl Stage {
    /// All stages in execution order
    pub const ALL: [Stage; 6] = [
        Self::ClaimParsing,
        Self::ClaimTyping,
        Self::EvidenceGraph,
        Self::FailureModes,
        Self::Scoring,
        Self::Explanation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClaimParsing => "claim_parsing",
            Self::ClaimTyping => "claim_typing",
            Self::EvidenceGraph => "evidence_graph",
            Self::FailureModes => "failure_modes",
            Self::Scoring => "scoring",
            Self::Explanation => "explanation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sealed stage output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: DeserializeOwned"))]
pub struct Artifact<T> {
    pub stage: Stage,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub content_hash: String,
    pub payload: T,
}

impl<T: Serialize> Artifact<T> {
    /// Seal a payload, hashing its JSON form
    pub fn seal(stage: Stage, payload: T) -> Result<Self, serde_json::Error> {
        let content_hash = hash_payload(&payload)?;
        Ok(Self {
            stage,
            version: ARTIFACT_VERSION.to_string(),
            created_at: Utc::now(),
            content_hash,
            payload,
        })
    }

    /// Recompute the payload hash and compare
    pub fn verify(&self) -> bool {
        hash_payload(&self.payload)
            .map(|hash| hash == self.content_hash)
            .unwrap_or(false)
    }
}

/// Hash of a value's canonical JSON serialization
pub fn hash_payload<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(compute_hash(&bytes))
}

/// SHA256 of a byte slice as "sha256:<hex>"
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seal_and_verify() {
        let artifact = Artifact::seal(Stage::Scoring, vec![1, 2, 3]).unwrap();
        assert_eq!(artifact.version, ARTIFACT_VERSION);
        assert!(artifact.content_hash.starts_with("sha256:"));
        assert!(artifact.verify());
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let mut artifact = Artifact::seal(Stage::Scoring, vec![1, 2, 3]).unwrap();
        artifact.payload.push(4);
        assert!(!artifact.verify());
    }

    #[test]
    fn test_hash_survives_round_trip() {
        let artifact = Artifact::seal(Stage::ClaimParsing, vec!["a".to_string()]).unwrap();
        let json = serde_json::to_string(&artifact).unwrap();
        let parsed: Artifact<Vec<String>> = serde_json::from_str(&json).unwrap();
        assert!(parsed.verify());
        assert_eq!(parsed.content_hash, artifact.content_hash);
    }

    #[test]
    fn test_compute_hash_consistency() {
        assert_eq!(compute_hash(b"claim"), compute_hash(b"claim"));
        assert_ne!(compute_hash(b"claim"), compute_hash(b"claims"));
        // "sha256:" + 64 hex chars
        assert_eq!(compute_hash(b"claim").len(), 71);
    }
}
