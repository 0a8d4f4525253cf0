use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::claim::AtomicClaim;
use super::entailment::EntailmentResult;
use super::evidence::EvidenceSource;

/// One claim plus everything the pipeline learned about it. The unit the
/// trust-score aggregator consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVerification {
    pub claim: AtomicClaim,
    pub evidence: Vec<EvidenceSource>,
    pub entailment: EntailmentResult,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSummary {
    pub verified: usize,
    pub contradicted: usize,
    pub unverified: usize,
}

/// Final output of the one-shot pipeline. Produced once per run; immutable.
/// `completed_at` is stamped when aggregation finishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub input_text: String,
    pub trust_score: u8,
    pub claims: Vec<ClaimVerification>,
    pub processing_time_ms: u64,
    pub summary: VerificationSummary,
    pub completed_at: DateTime<Utc>,
}
