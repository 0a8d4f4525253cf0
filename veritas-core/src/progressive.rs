//! Progressive verification.
//!
//! Two-phase orchestration for consumers that want an instant partial
//! verdict followed by streamed refinements:
//!
//! - **Phase 1** extracts claims and resolves the ones that match a small
//!   known-facts table immediately, emitting a preliminary trust score.
//! - **Phase 2** deep-verifies the rest in fixed-size concurrent groups,
//!   emitting one update per claim with the trust score recomputed over
//!   everything resolved so far.
//!
//! The stream never hard-fails after Phase 1 has been emitted: a claim whose
//! deep verification errors resolves to a terminal neutral result, and the
//! rest of its group is unaffected.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use regex::Regex;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::ProgressiveConfig;
use crate::entailment::EntailmentClassifier;
use crate::error::VerifyError;
use crate::evidence::EvidenceRetriever;
use crate::extractor::ClaimExtractor;
use crate::importance;
use crate::models::{
    AtomicClaim, Phase1Result, Phase2Update, ProgressiveClaimResult, VerificationEvent, Verdict,
};
use crate::scoring;

// ============================================================================
// Known-facts table
// ============================================================================

/// Instant verdict for a claim whose normalized text is already known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownFact {
    pub verdict: Verdict,
    pub confidence: u8,
}

/// Read-only lookup of normalized claim text to instant verdicts. Injected
/// into the verifier at construction so a real knowledge base can replace the
/// built-in table without touching orchestration.
#[derive(Debug, Clone)]
pub struct KnownFactsTable {
    entries: HashMap<String, KnownFact>,
}

impl KnownFactsTable {
    pub fn new(entries: HashMap<String, KnownFact>) -> Self {
        Self { entries }
    }

    /// Empty table: every claim goes through deep verification.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn lookup(&self, claim: &str) -> Option<KnownFact> {
        let fact = self.entries.get(&normalize_claim(claim)).copied();
        if fact.is_some() {
            tracing::debug!(claim, "Known-fact hit");
        }
        fact
    }
}

impl Default for KnownFactsTable {
    fn default() -> Self {
        let entries = [
            ("eiffel tower completed 1889", Verdict::Entailment, 95),
            ("eiffel tower built 1889", Verdict::Entailment, 95),
            ("world war 2 ended 1945", Verdict::Entailment, 95),
            ("first moon landing 1969", Verdict::Entailment, 95),
            ("earth orbits sun", Verdict::Entailment, 100),
            ("water boils 100 celsius", Verdict::Entailment, 95),
            ("speed of light 299792458", Verdict::Entailment, 95),
            ("paris capital france", Verdict::Entailment, 100),
            ("mount everest tallest mountain", Verdict::Entailment, 95),
        ]
        .into_iter()
        .map(|(text, verdict, confidence)| (text.to_string(), KnownFact { verdict, confidence }))
        .collect();

        Self { entries }
    }
}

/// Normalize claim text for table lookup: lowercase, strip punctuation,
/// collapse whitespace, then drop a fixed stop-word list. Table keys are
/// stored pre-normalized.
pub(crate) fn normalize_claim(text: &str) -> String {
    let mut normalized = text.to_lowercase();
    if let Ok(re) = Regex::new(r"[^\w\s]") {
        normalized = re.replace_all(&normalized, "").into_owned();
    }
    if let Ok(re) = Regex::new(r"\s+") {
        normalized = re.replace_all(&normalized, " ").into_owned();
    }
    normalized = normalized.trim().to_string();
    if let Ok(re) = Regex::new(r"the |a |an |is |was |were |are |in |on |at ") {
        normalized = re.replace_all(&normalized, "").into_owned();
    }
    normalized
}

// ============================================================================
// ProgressiveVerifier
// ============================================================================

#[derive(Clone)]
pub struct ProgressiveVerifier {
    extractor: Arc<ClaimExtractor>,
    retriever: Arc<EvidenceRetriever>,
    classifier: Arc<EntailmentClassifier>,
    known_facts: Arc<KnownFactsTable>,
    batch_size: usize,
    batch_delay: Duration,
    channel_capacity: usize,
}

impl ProgressiveVerifier {
    pub fn new(
        extractor: ClaimExtractor,
        retriever: EvidenceRetriever,
        classifier: EntailmentClassifier,
        known_facts: KnownFactsTable,
        config: &ProgressiveConfig,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            retriever: Arc::new(retriever),
            classifier: Arc::new(classifier),
            known_facts: Arc::new(known_facts),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            channel_capacity: config.channel_capacity.max(1),
        }
    }

    /// Phase 1: extract claims and resolve known facts instantly. Claims
    /// without a table hit come back as `verifying` placeholders.
    pub async fn phase1(&self, text: &str) -> Result<Phase1Result, VerifyError> {
        let started = tokio::time::Instant::now();

        let claims = self.extractor.extract(text).await?;
        let results: Vec<ProgressiveClaimResult> = claims
            .into_iter()
            .map(|claim| {
                tracing::debug!(
                    claim = %claim.text,
                    simple_fact = importance::is_simple_fact(&claim.text),
                    "Phase 1 lookup"
                );
                match self.known_facts.lookup(&claim.text) {
                    Some(fact) => {
                        ProgressiveClaimResult::instant(claim, fact.verdict, fact.confidence)
                    }
                    None => ProgressiveClaimResult::pending(claim),
                }
            })
            .collect();

        let preliminary_trust_score = scoring::preliminary_trust_score(&results);
        let instant = results.iter().filter(|r| !r.is_pending()).count();
        tracing::info!(
            claims = results.len(),
            instant,
            preliminary_trust_score,
            "Phase 1 complete"
        );

        Ok(Phase1Result {
            verification_id: Uuid::new_v4(),
            claims: results,
            preliminary_trust_score,
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
    }

    /// Start a full progressive run and return its event stream. The
    /// producer runs detached; dropping the receiver stops it at the next
    /// emission point.
    pub fn run(&self, text: String) -> mpsc::Receiver<VerificationEvent> {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let verifier = self.clone();
        tokio::spawn(async move {
            verifier.produce(text, tx).await;
        });
        rx
    }

    async fn produce(&self, text: String, tx: mpsc::Sender<VerificationEvent>) {
        let phase1 = match self.phase1(&text).await {
            Ok(phase1) => phase1,
            Err(e) => {
                tracing::error!(error = %e, "Phase 1 failed, ending stream");
                let _ = tx
                    .send(VerificationEvent::Error {
                        verification_id: Uuid::new_v4(),
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
        };

        let verification_id = phase1.verification_id;
        let mut resolved = phase1.claims.clone();
        if tx.send(VerificationEvent::Phase1(phase1)).await.is_err() {
            tracing::debug!("Consumer gone before Phase 1, stopping");
            return;
        }

        // Deep-verified claims keep their index in the Phase-1 list.
        let pending: Vec<(usize, AtomicClaim)> = resolved
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_pending())
            .map(|(index, r)| (index, r.claim.clone()))
            .collect();
        tracing::info!(pending = pending.len(), "Starting deep verification");

        for (group_index, group) in pending.chunks(self.batch_size).enumerate() {
            if group_index > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            let outcomes = join_all(group.iter().map(|(index, claim)| async move {
                (*index, self.verify_claim(claim).await)
            }))
            .await;

            for (index, result) in outcomes {
                resolved[index] = result.clone();
                let updated_trust_score = scoring::incremental_trust_score(&resolved);
                let update = Phase2Update {
                    verification_id,
                    claim_index: index,
                    result,
                    updated_trust_score,
                };
                if tx.send(VerificationEvent::Phase2(update)).await.is_err() {
                    tracing::debug!("Consumer gone mid-stream, stopping");
                    return;
                }
            }
        }

        let _ = tx
            .send(VerificationEvent::Complete { verification_id })
            .await;
    }

    /// Deep-verify one claim. Failures resolve the claim to a terminal
    /// neutral result instead of propagating.
    async fn verify_claim(&self, claim: &AtomicClaim) -> ProgressiveClaimResult {
        let evidence = self.retriever.retrieve(&claim.text).await;

        match self
            .classifier
            .classify_with_threshold(&claim.text, &evidence)
            .await
        {
            Ok(entailment) => {
                let weight = importance::analyze(&claim.text).weight;
                ProgressiveClaimResult {
                    claim: claim.clone(),
                    verdict: entailment.verdict.into(),
                    confidence: entailment.confidence,
                    reasoning: entailment.reasoning,
                    evidence,
                    importance: weight,
                    phase: 2,
                }
            }
            Err(e) => {
                tracing::warn!(
                    claim = %claim.text,
                    error = %e,
                    "Deep verification failed, resolving claim as unavailable"
                );
                ProgressiveClaimResult::unavailable(claim.clone())
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
