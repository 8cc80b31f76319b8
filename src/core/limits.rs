//! Input limits checked before the pipeline starts.
//!
//! Rejects input that cannot be evaluated at all:
//! - empty or whitespace-only text
//! - text above the byte limit
//! - claim sets that are empty, too large, or carry duplicate ids

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::StructuredClaim;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputLimits {
    /// Maximum submitted text size in bytes (default: 20KB)
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,

    /// Maximum claims evaluated per analysis (default: 12)
    #[serde(default = "default_max_claims")]
    pub max_claims: usize,
}

fn default_max_input_bytes() -> usize {
    20_000
}
fn default_max_claims() -> usize {
    12
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: default_max_input_bytes(),
            max_claims: default_max_claims(),
        }
    }
}

impl InputLimits {
    /// Validate raw submitted text
    pub fn validate_text(&self, text: &str) -> Result<(), InputViolation> {
        if text.trim().is_empty() {
            return Err(InputViolation::EmptyInput);
        }

        let size = text.len();
        if size > self.max_input_bytes {
            return Err(InputViolation::InputTooLarge {
                actual: size,
                limit: self.max_input_bytes,
            });
        }

        Ok(())
    }

    /// Validate a parsed or caller-supplied claim set
    pub fn validate_claims(&self, claims: &[StructuredClaim]) -> Result<(), InputViolation> {
        if claims.is_empty() {
            return Err(InputViolation::NoClaims);
        }

        if claims.len() > self.max_claims {
            return Err(InputViolation::TooManyClaims {
                actual: claims.len(),
                limit: self.max_claims,
            });
        }

        let mut seen = HashSet::new();
        for claim in claims {
            if claim.text.trim().is_empty() {
                return Err(InputViolation::EmptyClaim {
                    claim_id: claim.id.clone(),
                });
            }
            if !seen.insert(claim.id.as_str()) {
                return Err(InputViolation::DuplicateClaimId {
                    claim_id: claim.id.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Input that cannot be evaluated
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputViolation {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Input too large: {actual} > {limit} bytes")]
    InputTooLarge { actual: usize, limit: usize },

    #[error("No claims could be extracted from the input")]
    NoClaims,

    #[error("Too many claims: {actual} > {limit}")]
    TooManyClaims { actual: usize, limit: usize },

    #[error("Claim {claim_id} has no text")]
    EmptyClaim { claim_id: String },

    #[error("Duplicate claim id: {claim_id}")]
    DuplicateClaimId { claim_id: String },
}
