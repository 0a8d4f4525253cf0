//! veritas-cli: hallucination verification from the command line
//!
//! Runs a block of text through the verification pipeline and prints either a
//! human-readable report or machine-readable JSON.
//!
//! # Subcommands
//! - `verify <TEXT | --file PATH> [--timeout-ms N] [--json]`: one-shot run
//! - `progressive <TEXT | --file PATH> [--json]`: streamed two-phase run

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use veritas_core::config::VeritasConfig;
use veritas_core::models::{
    ProgressiveVerdict, VerificationEvent, VerificationResult, Verdict,
};
use veritas_core::{
    ClaimExtractor, EntailmentClassifier, EvidenceRetriever, ExaSearchClient,
    GroqGenerationClient, KnownFactsTable, MemoryCache, ProgressiveVerifier,
    VerificationPipeline,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(
    name = "veritas-cli",
    version,
    about = "Verify AI-generated text against web evidence"
)]
struct Cli {
    /// Config file path (TOML)
    #[arg(short, long, default_value = "veritas.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the one-shot pipeline and print the final result
    Verify {
        /// Text to verify (or use --file)
        text: Option<String>,

        /// Read the text to verify from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Overall timeout in milliseconds (defaults to the configured value)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Stream two-phase verification events as they resolve
    Progressive {
        /// Text to verify (or use --file)
        text: Option<String>,

        /// Read the text to verify from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Print one JSON event per line
        #[arg(long)]
        json: bool,
    },
}

fn resolve_input(text: Option<String>, file: Option<PathBuf>) -> anyhow::Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => anyhow::bail!("provide TEXT or --file PATH"),
    }
}

// ============================================================================
// Pipeline construction
// ============================================================================

fn build_components(
    config: &VeritasConfig,
) -> anyhow::Result<(ClaimExtractor, EvidenceRetriever, EntailmentClassifier)> {
    let generator = Arc::new(GroqGenerationClient::new(config.generation.clone())?);
    let search = Arc::new(ExaSearchClient::new(&config.search)?);

    let mut extractor = ClaimExtractor::new(generator.clone(), config.retry.clone());
    let mut retriever = EvidenceRetriever::new(
        search,
        config.search.clone(),
        config.retry.clone(),
        &config.pipeline,
    );
    if config.cache.enabled {
        let cache = Arc::new(MemoryCache::new());
        let ttl = Duration::from_secs(config.cache.ttl_secs);
        extractor = extractor.with_cache(cache.clone(), ttl);
        retriever = retriever.with_cache(cache, ttl);
    }
    let classifier =
        EntailmentClassifier::new(generator, config.retry.clone(), &config.pipeline);

    Ok((extractor, retriever, classifier))
}

// ============================================================================
// Output formatting
// ============================================================================

fn verdict_label(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Entailment => "supported",
        Verdict::Contradiction => "contradicted",
        Verdict::Neutral => "unverified",
    }
}

fn progressive_label(verdict: ProgressiveVerdict) -> &'static str {
    match verdict {
        ProgressiveVerdict::Entailment => "supported",
        ProgressiveVerdict::Contradiction => "contradicted",
        ProgressiveVerdict::Neutral => "unverified",
        ProgressiveVerdict::Verifying => "verifying",
    }
}

/// Human-readable report for a one-shot run.
fn format_result(result: &VerificationResult) -> String {
    let mut out = format!(
        "Trust score: {}/100 ({} claims, {} ms)\n",
        result.trust_score,
        result.claims.len(),
        result.processing_time_ms
    );
    out.push_str(&format!(
        "Summary: {} supported, {} contradicted, {} unverified\n",
        result.summary.verified, result.summary.contradicted, result.summary.unverified
    ));

    for (index, claim) in result.claims.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}\n", index + 1, claim.claim.text));
        out.push_str(&format!(
            "    {} ({}% confidence, {} sources)\n",
            verdict_label(claim.entailment.verdict),
            claim.entailment.confidence,
            claim.evidence.len()
        ));
        out.push_str(&format!("    {}\n", claim.entailment.reasoning));
    }

    out
}

/// One text line per streamed event.
fn format_event(event: &VerificationEvent) -> String {
    match event {
        VerificationEvent::Phase1(phase1) => {
            let instant = phase1.claims.iter().filter(|c| !c.is_pending()).count();
            format!(
                "phase 1: {} claims, {} resolved instantly, preliminary score {}/100",
                phase1.claims.len(),
                instant,
                phase1.preliminary_trust_score
            )
        }
        VerificationEvent::Phase2(update) => format!(
            "claim {}: {} ({}% confidence), score now {}/100",
            update.claim_index + 1,
            progressive_label(update.result.verdict),
            update.result.confidence,
            update.updated_trust_score
        ),
        VerificationEvent::Complete { .. } => "verification complete".to_string(),
        VerificationEvent::Error { message, .. } => {
            format!("verification failed: {}", message)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

async fn run_verify(
    config: &VeritasConfig,
    text: String,
    timeout_ms: Option<u64>,
    json: bool,
) -> anyhow::Result<()> {
    let (extractor, retriever, classifier) = build_components(config)?;
    let pipeline = VerificationPipeline::new(extractor, retriever, classifier);

    let timeout_ms = timeout_ms.unwrap_or(config.pipeline.default_timeout_ms);
    let result = pipeline.verify_with_timeout(&text, timeout_ms).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print!("{}", format_result(&result));
    }
    Ok(())
}

async fn run_progressive(
    config: &VeritasConfig,
    text: String,
    json: bool,
) -> anyhow::Result<()> {
    let (extractor, retriever, classifier) = build_components(config)?;
    let verifier = ProgressiveVerifier::new(
        extractor,
        retriever,
        classifier,
        KnownFactsTable::default(),
        &config.progressive,
    );

    let mut rx = verifier.run(text);
    let mut failed = false;
    while let Some(event) = rx.recv().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", format_event(&event));
        }
        if matches!(&event, VerificationEvent::Error { .. }) {
            failed = true;
        }
    }

    if failed {
        anyhow::bail!("verification did not complete");
    }
    Ok(())
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    // Load .env if present so API keys can live outside the config file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let config = match VeritasConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!(
                "veritas-cli: failed to load config from {}: {}",
                cli.config, e
            );
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Commands::Verify {
            text,
            file,
            timeout_ms,
            json,
        } => match resolve_input(text, file) {
            Ok(input) => run_verify(&config, input, timeout_ms, json).await,
            Err(e) => {
                eprintln!("veritas-cli: {}", e);
                std::process::exit(2);
            }
        },
        Commands::Progressive { text, file, json } => match resolve_input(text, file) {
            Ok(input) => run_progressive(&config, input, json).await,
            Err(e) => {
                eprintln!("veritas-cli: {}", e);
                std::process::exit(2);
            }
        },
    };

    if let Err(e) = result {
        eprintln!("veritas-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use veritas_core::models::{
        AtomicClaim, ClaimType, ClaimVerification, EntailmentResult, Phase1Result,
        Phase2Update, ProgressiveClaimResult, VerificationSummary,
    };

    fn claim(text: &str) -> AtomicClaim {
        AtomicClaim {
            text: text.to_string(),
            claim_type: ClaimType::Factual,
            start_index: 0,
            end_index: text.len(),
        }
    }

    fn verification(text: &str, verdict: Verdict, confidence: u8) -> ClaimVerification {
        ClaimVerification {
            claim: claim(text),
            evidence: Vec::new(),
            entailment: EntailmentResult {
                verdict,
                confidence,
                reasoning: "checked".to_string(),
            },
        }
    }

    fn result_fixture() -> VerificationResult {
        VerificationResult {
            input_text: "The Eiffel Tower was completed in 1889.".to_string(),
            trust_score: 98,
            claims: vec![verification(
                "The Eiffel Tower was completed in 1889.",
                Verdict::Entailment,
                95,
            )],
            processing_time_ms: 1200,
            summary: VerificationSummary {
                verified: 1,
                contradicted: 0,
                unverified: 0,
            },
            completed_at: chrono::Utc::now(),
        }
    }

    // ========================================================================
    // TEST 1: one-shot report carries score, summary, and verdict labels
    // ========================================================================
    #[test]
    fn test_format_result_report() {
        let report = format_result(&result_fixture());

        assert!(report.starts_with("Trust score: 98/100"));
        assert!(report.contains("Summary: 1 supported, 0 contradicted, 0 unverified"));
        assert!(report.contains("[1] The Eiffel Tower was completed in 1889."));
        assert!(report.contains("supported (95% confidence, 0 sources)"));
    }

    // ========================================================================
    // TEST 2: verdict labels cover every variant
    // ========================================================================
    #[test]
    fn test_verdict_labels() {
        assert_eq!(verdict_label(Verdict::Entailment), "supported");
        assert_eq!(verdict_label(Verdict::Contradiction), "contradicted");
        assert_eq!(verdict_label(Verdict::Neutral), "unverified");
        assert_eq!(progressive_label(ProgressiveVerdict::Verifying), "verifying");
    }

    // ========================================================================
    // TEST 3: phase-1 event line reports instant resolutions
    // ========================================================================
    #[test]
    fn test_format_event_phase1() {
        let phase1 = Phase1Result {
            verification_id: uuid::Uuid::new_v4(),
            claims: vec![
                ProgressiveClaimResult::instant(claim("Known."), Verdict::Entailment, 95),
                ProgressiveClaimResult::pending(claim("Unknown.")),
            ],
            preliminary_trust_score: 95,
            processing_time_ms: 40,
        };

        let line = format_event(&VerificationEvent::Phase1(phase1));
        assert_eq!(
            line,
            "phase 1: 2 claims, 1 resolved instantly, preliminary score 95/100"
        );
    }

    // ========================================================================
    // TEST 4: phase-2 event line is 1-indexed and carries the running score
    // ========================================================================
    #[test]
    fn test_format_event_phase2() {
        let mut result = ProgressiveClaimResult::pending(claim("Unknown."));
        result.verdict = ProgressiveVerdict::Contradiction;
        result.confidence = 88;
        result.phase = 2;

        let update = Phase2Update {
            verification_id: uuid::Uuid::new_v4(),
            claim_index: 1,
            result,
            updated_trust_score: 31,
        };

        let line = format_event(&VerificationEvent::Phase2(update));
        assert_eq!(line, "claim 2: contradicted (88% confidence), score now 31/100");
    }

    // ========================================================================
    // TEST 5: terminal events format as single lines
    // ========================================================================
    #[test]
    fn test_format_event_terminals() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(
            format_event(&VerificationEvent::Complete { verification_id: id }),
            "verification complete"
        );
        assert_eq!(
            format_event(&VerificationEvent::Error {
                verification_id: id,
                message: "API error (500): upstream broken".to_string(),
            }),
            "verification failed: API error (500): upstream broken"
        );
    }

    // ========================================================================
    // TEST 6: input resolution prefers inline text and rejects nothing
    // ========================================================================
    #[test]
    fn test_resolve_input() {
        assert_eq!(
            resolve_input(Some("inline".to_string()), None).unwrap(),
            "inline"
        );
        assert!(resolve_input(None, None).is_err());
    }
}
