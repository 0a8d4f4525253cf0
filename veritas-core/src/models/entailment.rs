use serde::{Deserialize, Serialize};

/// NLI verdict for a claim against its evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Entailment,
    Contradiction,
    Neutral,
}

/// Classification outcome. Unrecognized verdict strings from the capability
/// coerce to `Neutral`; confidence is clamped to 0..=100 at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntailmentResult {
    pub verdict: Verdict,
    pub confidence: u8,
    pub reasoning: String,
}

impl EntailmentResult {
    pub fn neutral(reasoning: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Neutral,
            confidence: 0,
            reasoning: reasoning.into(),
        }
    }
}
