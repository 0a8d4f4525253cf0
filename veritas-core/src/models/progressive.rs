use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::claim::AtomicClaim;
use super::entailment::Verdict;
use super::evidence::EvidenceSource;

/// Verdict space for the progressive pipeline: the three NLI verdicts plus
/// `Verifying` for claims still awaiting their deep-verification pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressiveVerdict {
    Entailment,
    Contradiction,
    Neutral,
    Verifying,
}

impl From<Verdict> for ProgressiveVerdict {
    fn from(v: Verdict) -> Self {
        match v {
            Verdict::Entailment => Self::Entailment,
            Verdict::Contradiction => Self::Contradiction,
            Verdict::Neutral => Self::Neutral,
        }
    }
}

/// Per-claim state in a progressive run. Created in Phase 1 (instant verdict
/// or `Verifying` placeholder), overwritten exactly once when Phase 2
/// completes it; terminal afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressiveClaimResult {
    pub claim: AtomicClaim,
    pub verdict: ProgressiveVerdict,
    pub confidence: u8,
    pub reasoning: String,
    pub evidence: Vec<EvidenceSource>,
    pub importance: f64,
    pub phase: u8,
}

impl ProgressiveClaimResult {
    /// Phase-1 instant verdict from the known-facts table.
    pub fn instant(claim: AtomicClaim, verdict: Verdict, confidence: u8) -> Self {
        Self {
            claim,
            verdict: verdict.into(),
            confidence,
            reasoning: "Verified against known facts database".to_string(),
            evidence: Vec::new(),
            importance: 1.0,
            phase: 1,
        }
    }

    /// Phase-1 placeholder for a claim queued for deep verification.
    pub fn pending(claim: AtomicClaim) -> Self {
        Self {
            claim,
            verdict: ProgressiveVerdict::Verifying,
            confidence: 0,
            reasoning: "Queued for deep verification".to_string(),
            evidence: Vec::new(),
            importance: 1.0,
            phase: 1,
        }
    }

    /// Terminal fallback when a claim's deep verification fails. Resolves the
    /// claim instead of aborting its group.
    pub fn unavailable(claim: AtomicClaim) -> Self {
        Self {
            claim,
            verdict: ProgressiveVerdict::Neutral,
            confidence: 0,
            reasoning: "Verification unavailable for this claim (temporary error)".to_string(),
            evidence: Vec::new(),
            importance: 1.0,
            phase: 2,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.verdict == ProgressiveVerdict::Verifying
    }
}

/// Phase-1 event payload: every claim (instant or pending) plus the
/// preliminary score over the instantly resolved subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase1Result {
    pub verification_id: Uuid,
    pub claims: Vec<ProgressiveClaimResult>,
    pub preliminary_trust_score: u8,
    pub processing_time_ms: u64,
}

/// One completed deep verification. `claim_index` points into the Phase-1
/// claim list; `updated_trust_score` covers all claims resolved so far.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Phase2Update {
    pub verification_id: Uuid,
    pub claim_index: usize,
    pub result: ProgressiveClaimResult,
    pub updated_trust_score: u8,
}

/// The progressive event stream: `Phase1`, zero or more `Phase2`, then a
/// terminal `Complete` (or `Error` if Phase 1 itself fails). The wire
/// transport is the consumer's concern; this enum is the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerificationEvent {
    Phase1(Phase1Result),
    Phase2(Phase2Update),
    #[serde(rename_all = "camelCase")]
    Complete { verification_id: Uuid },
    #[serde(rename_all = "camelCase")]
    Error {
        verification_id: Uuid,
        message: String,
    },
}
