pub mod cache;
pub mod config;
pub mod entailment;
pub mod error;
pub mod evidence;
pub mod extractor;
pub mod generation;
pub mod importance;
pub mod models;
pub mod pipeline;
pub mod progressive;
pub mod retry;
pub mod scoring;
pub mod search;

pub use cache::{MemoryCache, NoopCache, VerificationCache};
pub use config::VeritasConfig;
pub use entailment::EntailmentClassifier;
pub use error::{CapabilityError, VerifyError};
pub use evidence::EvidenceRetriever;
pub use extractor::ClaimExtractor;
pub use generation::{GroqGenerationClient, TextGenerator};
pub use models::{VerificationEvent, VerificationResult};
pub use pipeline::VerificationPipeline;
pub use progressive::{KnownFact, KnownFactsTable, ProgressiveVerifier};
pub use search::{EvidenceSearch, ExaSearchClient};
