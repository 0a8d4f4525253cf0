use serde::{Deserialize, Serialize};

/// One ranked evidence hit for a claim. Only sources with `score > 0.3`
/// survive retrieval filtering. Owned by the claim's verification record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceSource {
    pub url: String,
    pub title: String,
    pub snippet: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub score: f32,
}
