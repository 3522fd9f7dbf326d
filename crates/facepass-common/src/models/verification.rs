use serde::{Deserialize, Serialize};

/// Result of a completed verification, as returned to the caller
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationOutcome {
    pub auth_result: bool,
    pub similarity: f64,
}

impl VerificationOutcome {
    /// Authenticated iff the score reaches the threshold (inclusive).
    pub fn decide(similarity: f64, threshold: f64) -> Self {
        Self {
            auth_result: similarity >= threshold,
            similarity,
        }
    }
}
