use serde::{Deserialize, Serialize};

/// Category assigned by the extraction capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimType {
    #[default]
    Factual,
    Numerical,
    Temporal,
    Causal,
    Comparative,
}

/// A single independently verifiable statement extracted from the input text.
/// `start_index`/`end_index` are character offsets into the original text,
/// snapped to sentence boundaries. Immutable after extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicClaim {
    pub text: String,
    #[serde(rename = "type", default)]
    pub claim_type: ClaimType,
    #[serde(default)]
    pub start_index: usize,
    #[serde(default)]
    pub end_index: usize,
}
