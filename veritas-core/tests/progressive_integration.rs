//! Integration tests for the progressive verification stream
//!
//! These tests verify:
//! 1. Phase 1 resolves known facts instantly and Phase 2 streams the rest
//! 2. A broken generation provider surfaces as a terminal error event

use std::sync::Arc;

use veritas_core::config::{
    GenerationConfig, PipelineConfig, ProgressiveConfig, RetryConfig, SearchConfig,
};
use veritas_core::models::{ProgressiveVerdict, VerificationEvent};
use veritas_core::{
    ClaimExtractor, EntailmentClassifier, EvidenceRetriever, ExaSearchClient,
    GroqGenerationClient, KnownFactsTable, ProgressiveVerifier,
};
use wiremock::matchers::{body_string_contains, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INPUT: &str =
    "The Eiffel Tower was completed in 1889. The Golden Gate Bridge opened in 1937.";

fn chat_response(content: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [
            { "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn extraction_content() -> String {
    let b_start = INPUT.find("The Golden").unwrap();
    format!(
        r#"{{"claims": [
            {{"text": "The Eiffel Tower was completed in 1889.", "type": "temporal", "startIndex": 0, "endIndex": 39}},
            {{"text": "The Golden Gate Bridge opened in 1937.", "type": "temporal", "startIndex": {}, "endIndex": {}}}
        ]}}"#,
        b_start,
        INPUT.len()
    )
}

fn build_verifier(
    generation_server: &MockServer,
    search_server: &MockServer,
) -> ProgressiveVerifier {
    let generation_config = GenerationConfig {
        api_key: Some("test-groq-key".to_string()),
        ..GenerationConfig::default()
    };
    let search_config = SearchConfig {
        api_key: Some("test-exa-key".to_string()),
        ..SearchConfig::default()
    };
    let pipeline_config = PipelineConfig {
        evidence_batch_delay_ms: 10,
        classify_delay_ms: 10,
        ..PipelineConfig::default()
    };
    let progressive_config = ProgressiveConfig {
        batch_delay_ms: 10,
        ..ProgressiveConfig::default()
    };
    let retry = RetryConfig {
        max_retries: 1,
        initial_delay_ms: 10,
    };

    let generator = Arc::new(
        GroqGenerationClient::with_base_url(generation_config, generation_server.uri())
            .expect("Failed to create generation client"),
    );
    let search = Arc::new(
        ExaSearchClient::with_base_url(&search_config, search_server.uri())
            .expect("Failed to create search client"),
    );

    ProgressiveVerifier::new(
        ClaimExtractor::new(generator.clone(), retry.clone()),
        EvidenceRetriever::new(search, search_config, retry.clone(), &pipeline_config),
        EntailmentClassifier::new(generator, retry, &pipeline_config),
        KnownFactsTable::default(),
        &progressive_config,
    )
}

async fn collect(mut rx: tokio::sync::mpsc::Receiver<VerificationEvent>) -> Vec<VerificationEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_progressive_stream_end_to_end() {
    let generation_server = MockServer::start().await;
    let search_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_string_contains("decompose the following text"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(chat_response(&extraction_content())),
        )
        .mount(&generation_server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("opened to traffic in 1937"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(
            "{\"verdict\": \"entailment\", \"confidence\": 95, \"reasoning\": \"matches\"}",
        )))
        .mount(&generation_server)
        .await;

    Mock::given(method("POST"))
        .and(body_string_contains("golden gate bridge"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "results": [
                {
                    "url": "https://example.com/bridge",
                    "title": "Golden Gate Bridge",
                    "text": "A long page about the bridge.",
                    "highlights": ["opened to traffic in 1937"],
                    "score": 0.9
                }
            ]
        })))
        .mount(&search_server)
        .await;

    let verifier = build_verifier(&generation_server, &search_server);
    let events = collect(verifier.run(INPUT.to_string())).await;

    assert_eq!(events.len(), 3, "phase 1, one update, complete");

    let phase1_id = match &events[0] {
        VerificationEvent::Phase1(p) => {
            assert_eq!(p.claims.len(), 2);
            // The Eiffel claim is in the known-facts table.
            assert_eq!(p.claims[0].verdict, ProgressiveVerdict::Entailment);
            assert_eq!(p.claims[0].phase, 1);
            assert!(p.claims[1].is_pending());
            assert_eq!(p.preliminary_trust_score, 95);
            p.verification_id
        }
        other => panic!("Expected Phase1, got {:?}", other),
    };

    match &events[1] {
        VerificationEvent::Phase2(u) => {
            assert_eq!(u.verification_id, phase1_id);
            assert_eq!(u.claim_index, 1);
            assert_eq!(u.result.verdict, ProgressiveVerdict::Entailment);
            assert_eq!(u.result.phase, 2);
            assert_eq!(u.result.evidence[0].snippet, "opened to traffic in 1937");
            assert_eq!(u.updated_trust_score, 98);
        }
        other => panic!("Expected Phase2, got {:?}", other),
    }

    assert!(matches!(
        &events[2],
        VerificationEvent::Complete { verification_id } if *verification_id == phase1_id
    ));
}

#[tokio::test]
async fn test_progressive_stream_reports_capability_failure() {
    let generation_server = MockServer::start().await;
    let search_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": { "message": "upstream broken" }
        })))
        .mount(&generation_server)
        .await;

    let verifier = build_verifier(&generation_server, &search_server);
    let events = collect(verifier.run(INPUT.to_string())).await;

    assert_eq!(events.len(), 1);
    match &events[0] {
        VerificationEvent::Error { message, .. } => {
            assert!(message.contains("API error (500)"), "got: {}", message);
        }
        other => panic!("Expected Error, got {:?}", other),
    }
}
