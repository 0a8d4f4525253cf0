//! Trust-score aggregation.
//!
//! Two deliberately distinct formulas share one min-max normalization. The
//! one-shot formula folds low-confidence claims in at half weight so the
//! final score is never fully neutral-washed; the incremental formula
//! excludes neutral and still-verifying claims entirely so an in-flight score
//! is never dragged toward 50 by claims that have not resolved yet.

use crate::importance;
use crate::models::{ClaimVerification, ProgressiveClaimResult, ProgressiveVerdict, Verdict};

const CONFIDENCE_THRESHOLD: f64 = 70.0;

/// Map a weighted sum in [-total*100, +total*100] onto 0..=100.
fn normalize(weighted_sum: f64, total_weight: f64) -> u8 {
    let score = (weighted_sum + total_weight * 100.0) / (2.0 * total_weight * 100.0) * 100.0;
    score.clamp(0.0, 100.0).round() as u8
}

/// One-shot formula for the full pipeline. Importance weights are recomputed
/// from claim text on every call; nothing is cached.
pub fn aggregate_trust_score(claims: &[ClaimVerification]) -> u8 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for cv in claims {
        let w = importance::analyze(&cv.claim.text).weight;
        let confidence = f64::from(cv.entailment.confidence);
        let signed = match cv.entailment.verdict {
            Verdict::Entailment => confidence,
            Verdict::Contradiction => -confidence,
            Verdict::Neutral => 0.0,
        };

        if confidence >= CONFIDENCE_THRESHOLD {
            if cv.entailment.verdict != Verdict::Neutral {
                weighted_sum += w * signed;
                total_weight += w;
            }
        } else {
            // Half weight regardless of verdict: uncertain claims pull toward
            // neutral instead of being ignored.
            weighted_sum += w * signed * 0.5;
            total_weight += w * 0.5;
        }
    }

    if total_weight == 0.0 {
        return 50;
    }
    normalize(weighted_sum, total_weight)
}

/// Incremental formula for the progressive pipeline, recomputed over all
/// claims after each deep-verification update. Only entailment and
/// contradiction verdicts are scorable; confidence below the threshold zeroes
/// a claim's contribution to the sum but keeps its weight. With no scorable
/// weight the score is 50 once anything has resolved, 0 before that.
pub fn incremental_trust_score(results: &[ProgressiveClaimResult]) -> u8 {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;

    for r in results {
        let confidence = f64::from(r.confidence);
        let signed = match r.verdict {
            ProgressiveVerdict::Entailment => confidence,
            ProgressiveVerdict::Contradiction => -confidence,
            ProgressiveVerdict::Neutral | ProgressiveVerdict::Verifying => continue,
        };
        let indicator = if confidence >= CONFIDENCE_THRESHOLD {
            1.0
        } else {
            0.0
        };
        weighted_sum += signed * indicator * r.importance;
        total_weight += r.importance;
    }

    if total_weight == 0.0 {
        let any_resolved = results
            .iter()
            .any(|r| r.verdict != ProgressiveVerdict::Verifying);
        return if any_resolved { 50 } else { 0 };
    }
    normalize(weighted_sum, total_weight)
}

/// Phase-1 preliminary score: plain signed-confidence average over the
/// instantly resolved subset. No evidence or importance data exists yet, so
/// the known-fact confidences are used directly; 50 when nothing resolved.
pub fn preliminary_trust_score(results: &[ProgressiveClaimResult]) -> u8 {
    let mut sum = 0.0;
    let mut count = 0u32;
    for r in results {
        match r.verdict {
            ProgressiveVerdict::Entailment => sum += f64::from(r.confidence),
            ProgressiveVerdict::Contradiction => sum -= f64::from(r.confidence),
            ProgressiveVerdict::Neutral | ProgressiveVerdict::Verifying => continue,
        }
        count += 1;
    }
    if count == 0 {
        return 50;
    }
    (sum / f64::from(count)).clamp(0.0, 100.0).round() as u8
}
