pub mod claim;
pub mod entailment;
pub mod evidence;
pub mod progressive;
pub mod verification;

pub use claim::{AtomicClaim, ClaimType};
pub use entailment::{EntailmentResult, Verdict};
pub use evidence::EvidenceSource;
pub use progressive::{
    Phase1Result, Phase2Update, ProgressiveClaimResult, ProgressiveVerdict, VerificationEvent,
};
pub use verification::{ClaimVerification, VerificationResult, VerificationSummary};
