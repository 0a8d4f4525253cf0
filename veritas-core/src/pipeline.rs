//! Full verification pipeline.
//!
//! One-shot orchestration: extract claims, batch-retrieve evidence,
//! batch-classify, aggregate into a trust score. Any unrecovered stage
//! error fails the whole run; the progressive path in [`crate::progressive`]
//! is the one that degrades per claim instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::entailment::EntailmentClassifier;
use crate::error::VerifyError;
use crate::evidence::EvidenceRetriever;
use crate::extractor::ClaimExtractor;
use crate::models::{
    ClaimVerification, EvidenceSource, VerificationResult, VerificationSummary, Verdict,
};
use crate::scoring;

// ============================================================================
// VerificationPipeline
// ============================================================================

#[derive(Clone)]
pub struct VerificationPipeline {
    extractor: Arc<ClaimExtractor>,
    retriever: Arc<EvidenceRetriever>,
    classifier: Arc<EntailmentClassifier>,
}

impl VerificationPipeline {
    pub fn new(
        extractor: ClaimExtractor,
        retriever: EvidenceRetriever,
        classifier: EntailmentClassifier,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            retriever: Arc::new(retriever),
            classifier: Arc::new(classifier),
        }
    }

    /// Run the whole pipeline over `text`.
    pub async fn verify(&self, text: &str) -> Result<VerificationResult, VerifyError> {
        let started = tokio::time::Instant::now();

        let claims = self.extractor.extract(text).await?;
        if claims.is_empty() {
            tracing::info!("No claims extracted, returning empty result");
            return Ok(VerificationResult {
                input_text: text.to_string(),
                trust_score: 0,
                claims: Vec::new(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                summary: VerificationSummary::default(),
                completed_at: Utc::now(),
            });
        }
        tracing::info!(count = claims.len(), "Extracted claims, retrieving evidence");

        let claim_texts: Vec<String> = claims.iter().map(|c| c.text.clone()).collect();
        let evidence_map = self.retriever.batch_retrieve(&claim_texts).await;

        let pairs: Vec<(String, Vec<EvidenceSource>)> = claims
            .iter()
            .map(|c| {
                (
                    c.text.clone(),
                    evidence_map.get(&c.text).cloned().unwrap_or_default(),
                )
            })
            .collect();
        let entailments = self.classifier.classify_batch(&pairs).await?;

        let verifications: Vec<ClaimVerification> = claims
            .into_iter()
            .zip(pairs.into_iter().map(|(_, evidence)| evidence))
            .zip(entailments)
            .map(|((claim, evidence), entailment)| ClaimVerification {
                claim,
                evidence,
                entailment,
            })
            .collect();

        let trust_score = scoring::aggregate_trust_score(&verifications);
        let summary = summarize(&verifications);
        tracing::info!(
            trust_score,
            verified = summary.verified,
            contradicted = summary.contradicted,
            unverified = summary.unverified,
            "Verification complete"
        );

        Ok(VerificationResult {
            input_text: text.to_string(),
            trust_score,
            claims: verifications,
            processing_time_ms: started.elapsed().as_millis() as u64,
            summary,
            completed_at: Utc::now(),
        })
    }

    /// Race [`Self::verify`] against a deadline. On timeout the caller gets
    /// [`VerifyError::Timeout`] and the run is abandoned; external calls
    /// already in flight finish on their own and their results are dropped.
    pub async fn verify_with_timeout(
        &self,
        text: &str,
        timeout_ms: u64,
    ) -> Result<VerificationResult, VerifyError> {
        let pipeline = self.clone();
        let input = text.to_string();
        let run = tokio::spawn(async move { pipeline.verify(&input).await });

        match tokio::time::timeout(Duration::from_millis(timeout_ms), run).await {
            Ok(Ok(result)) => result,
            // The task is never aborted, so a join failure is a panic
            // inside the pipeline.
            Ok(Err(join_error)) => std::panic::resume_unwind(join_error.into_panic()),
            Err(_) => {
                tracing::warn!(timeout_ms, "Verification timed out, abandoning the run");
                Err(VerifyError::Timeout { timeout_ms })
            }
        }
    }
}

fn summarize(verifications: &[ClaimVerification]) -> VerificationSummary {
    let mut summary = VerificationSummary::default();
    for v in verifications {
        match v.entailment.verdict {
            Verdict::Entailment => summary.verified += 1,
            Verdict::Contradiction => summary.contradicted += 1,
            Verdict::Neutral => summary.unverified += 1,
        }
    }
    summary
}

// ============================================================================
// TESTS
// ============================================================================
