//! Entailment classification.
//!
//! Decides whether retrieved evidence supports, contradicts, or says nothing
//! about a claim, via an NLI-style prompt to the text-generation capability.
//! Claims with no evidence short-circuit to neutral without spending a
//! generation call. Batch classification is strictly sequential with a fixed
//! delay because the generation quota is tighter than the search quota.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{PipelineConfig, RetryConfig};
use crate::error::VerifyError;
use crate::generation::{first_json_object, TextGenerator};
use crate::models::{EntailmentResult, EvidenceSource, Verdict};
use crate::retry::execute_with_retry;

/// Evidence sources included in the prompt context.
const CONTEXT_SOURCES: usize = 3;

// ============================================================================
// EntailmentClassifier
// ============================================================================

pub struct EntailmentClassifier {
    generator: Arc<dyn TextGenerator>,
    retry: RetryConfig,
    confidence_threshold: u8,
    classify_delay: Duration,
}

impl EntailmentClassifier {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        retry: RetryConfig,
        pipeline: &PipelineConfig,
    ) -> Self {
        Self {
            generator,
            retry,
            confidence_threshold: pipeline.confidence_threshold,
            classify_delay: Duration::from_millis(pipeline.classify_delay_ms),
        }
    }

    /// Classify one claim against its evidence.
    pub async fn classify(
        &self,
        claim: &str,
        evidence: &[EvidenceSource],
    ) -> Result<EntailmentResult, VerifyError> {
        if evidence.is_empty() {
            return Ok(EntailmentResult::neutral(
                "No evidence found to verify this claim",
            ));
        }

        let prompt = build_nli_prompt(claim, evidence);
        let response = execute_with_retry(&self.retry, || self.generator.generate(&prompt)).await?;
        parse_entailment(&response)
    }

    /// Classify and downgrade non-neutral verdicts whose confidence falls
    /// below the threshold. Keeps low-confidence contradictions and
    /// entailments from swinging the trust score.
    pub async fn classify_with_threshold(
        &self,
        claim: &str,
        evidence: &[EvidenceSource],
    ) -> Result<EntailmentResult, VerifyError> {
        let result = self.classify(claim, evidence).await?;
        Ok(self.apply_threshold(result))
    }

    fn apply_threshold(&self, result: EntailmentResult) -> EntailmentResult {
        if result.confidence < self.confidence_threshold && result.verdict != Verdict::Neutral {
            tracing::debug!(
                verdict = ?result.verdict,
                confidence = result.confidence,
                threshold = self.confidence_threshold,
                "Downgrading low-confidence verdict to neutral"
            );
            return EntailmentResult {
                verdict: Verdict::Neutral,
                confidence: result.confidence,
                reasoning: format!("{} (Confidence below threshold)", result.reasoning),
            };
        }
        result
    }

    /// Classify claim/evidence pairs one at a time, pacing between calls.
    /// Errors abort the whole batch.
    pub async fn classify_batch(
        &self,
        pairs: &[(String, Vec<EvidenceSource>)],
    ) -> Result<Vec<EntailmentResult>, VerifyError> {
        let mut results = Vec::with_capacity(pairs.len());

        for (index, (claim, evidence)) in pairs.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.classify_delay).await;
            }
            let result = self.classify_with_threshold(claim, evidence).await?;
            tracing::debug!(index, verdict = ?result.verdict, "Classified claim");
            results.push(result);
        }

        Ok(results)
    }
}

// ============================================================================
// Prompt and response handling
// ============================================================================

fn build_nli_prompt(claim: &str, evidence: &[EvidenceSource]) -> String {
    let context = evidence
        .iter()
        .take(CONTEXT_SOURCES)
        .enumerate()
        .map(|(i, e)| format!("[Source {}] {}\n{}\nURL: {}", i + 1, e.title, e.snippet, e.url))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"You are an advanced Natural Language Inference (NLI) system with cross-attention capabilities.

TASK: Perform semantic entailment classification using cross-attention between claim and evidence.

CLAIM:
"""
{claim}
"""

EVIDENCE:
"""
{context}
"""

CRITICAL INSTRUCTIONS:
1. **Thorough Text Analysis**: Carefully read ALL the evidence text, not just titles or URLs
2. **Extract Key Facts**: Look for specific facts, dates, numbers, and names mentioned in BOTH claim and evidence
3. **Compare Facts Explicitly**: If the claim mentions a specific date/number/name, check if the evidence mentions a DIFFERENT one
4. **Contradiction Detection**: If evidence states a DIFFERENT fact than the claim, that's a CONTRADICTION (not neutral!)
5. **Be Precise**: Only mark as neutral if the evidence truly doesn't mention the topic at all

CLASSIFICATION RULES (CRITICAL - READ CAREFULLY):

**CONTRADICTION** (Most Important - Don't Miss These!):
- Evidence contains DIFFERENT factual information than the claim
  * Example: Claim says "built in 1822", evidence says "built in 1889" -> CONTRADICTION
  * Example: Claim says "330 meters tall", evidence says "300 meters tall" -> CONTRADICTION
- Direct factual conflict with authoritative sources
- **IMPORTANT**: If you find ANY conflicting fact in the evidence, classify as CONTRADICTION!

**ENTAILMENT**:
- Evidence text EXPLICITLY contains information that supports the claim
- The EXACT same facts, dates, or numbers are present in both claim and evidence
  * Example: Claim says "built in 1889", evidence says "completed in 1889" -> ENTAILMENT
- Authoritative source confirmation

**NEUTRAL** (Use Sparingly!):
- Evidence is insufficient or doesn't mention the specific topic at all
- **NOT neutral if**: Evidence mentions the topic but with different facts (that's CONTRADICTION!)

CONFIDENCE SCORING:
- 90-100: Multiple sources with exact matching facts OR clear contradiction
- 75-89: Clear support/refutation from reliable sources
- 50-74: Partial or indirect evidence
- 0-49: Weak or missing evidence

**CRITICAL REMINDER**: When you see conflicting dates, numbers, or facts between claim and evidence, always classify as CONTRADICTION, not neutral!

OUTPUT FORMAT (JSON):
{{
  "verdict": "entailment|contradiction|neutral",
  "confidence": 85,
  "reasoning": "Explanation citing specific facts found (or not found) in the evidence text. If contradiction, state what the claim says vs what the evidence says."
}}

Classify now:"#
    )
}

fn parse_entailment(response: &str) -> Result<EntailmentResult, VerifyError> {
    let json = first_json_object(response).ok_or_else(|| {
        VerifyError::Classification("response contained no JSON object".to_string())
    })?;
    let parsed: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| VerifyError::Classification(format!("invalid JSON in response: {}", e)))?;

    let verdict = match parsed.get("verdict").and_then(|v| v.as_str()) {
        Some("entailment") => Verdict::Entailment,
        Some("contradiction") => Verdict::Contradiction,
        Some("neutral") => Verdict::Neutral,
        other => {
            tracing::warn!(verdict = ?other, "Unrecognized verdict, coercing to neutral");
            Verdict::Neutral
        }
    };

    let confidence = parsed
        .get("confidence")
        .and_then(|c| c.as_f64())
        .unwrap_or(0.0)
        .clamp(0.0, 100.0)
        .round() as u8;

    let reasoning = parsed
        .get("reasoning")
        .and_then(|r| r.as_str())
        .unwrap_or("No reasoning provided")
        .to_string();

    Ok(EntailmentResult {
        verdict,
        confidence,
        reasoning,
    })
}

// ============================================================================
// TESTS
// ============================================================================
