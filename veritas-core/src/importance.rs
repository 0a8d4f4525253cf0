//! Claim-importance analysis.
//!
//! Scores how checkable a claim is: claims naming specific entities, numbers,
//! or dates should move the trust score more than vague ones. The weight is
//! derived on demand from the claim text and never persisted.

use serde::Serialize;

/// Word-count bucket for a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Medium,
    Complex,
}

/// Feature breakdown plus the final aggregation weight, always in [0.5, 2.0].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImportanceSignals {
    pub weight: f64,
    pub has_proper_noun: bool,
    pub has_number: bool,
    pub has_date: bool,
    pub complexity: Complexity,
}

const PROPER_NOUN: &str = r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)*\b";
const NUMBER: &str = r"\b\d+(?:,\d{3})*(?:\.\d+)?\b";
const YEAR: &str = r"\b(19|20)\d{2}\b";
const MONTH_DATE: &str = r"(?i)\b(January|February|March|April|May|June|July|August|September|October|November|December)\s+\d{1,2},?\s+\d{4}\b";

fn matches_pattern(pattern: &str, text: &str) -> bool {
    regex::Regex::new(pattern)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Score one claim. Base weight 1.0; +0.4 for a proper noun, +0.3 for a
/// number, +0.3 for a date; x0.9 for five-or-fewer words, x1.1 for more than
/// fifteen; clamped to [0.5, 2.0].
pub fn analyze(text: &str) -> ImportanceSignals {
    let has_proper_noun = matches_pattern(PROPER_NOUN, text);
    let has_number = matches_pattern(NUMBER, text);
    let has_date = matches_pattern(YEAR, text) || matches_pattern(MONTH_DATE, text);

    let word_count = text.split_whitespace().count();
    let complexity = if word_count <= 5 {
        Complexity::Simple
    } else if word_count > 15 {
        Complexity::Complex
    } else {
        Complexity::Medium
    };

    let mut weight: f64 = 1.0;
    if has_proper_noun {
        weight += 0.4;
    }
    if has_number {
        weight += 0.3;
    }
    if has_date {
        weight += 0.3;
    }
    weight *= match complexity {
        Complexity::Simple => 0.9,
        Complexity::Medium => 1.0,
        Complexity::Complex => 1.1,
    };

    ImportanceSignals {
        weight: weight.clamp(0.5, 2.0),
        has_proper_noun,
        has_number,
        has_date,
        complexity,
    }
}

/// Short claim naming something concrete. Likely resolvable from the
/// known-facts table without a deep pass.
pub fn is_simple_fact(text: &str) -> bool {
    let signals = analyze(text);
    text.split_whitespace().count() <= 8 && (signals.has_proper_noun || signals.has_number)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==== TEST 1: proper noun + number + year hits the 2.0 ceiling ====
    #[test]
    fn test_specific_claim_scores_maximum_weight() {
        let signals = analyze("The Berlin Wall fell in 1989");
        assert!(signals.has_proper_noun);
        assert!(signals.has_number);
        assert!(signals.has_date);
        assert_eq!(signals.complexity, Complexity::Medium);
        assert_eq!(signals.weight, 2.0);
    }

    // ==== TEST 2: vague lowercase claim keeps the base weight ====
    #[test]
    fn test_vague_claim_scores_base_weight() {
        let signals = analyze("things generally improve over longer periods");
        assert!(!signals.has_proper_noun);
        assert!(!signals.has_number);
        assert!(!signals.has_date);
        assert!((signals.weight - 1.0).abs() < 1e-9);
    }

    // ==== TEST 3: short claims are discounted ====
    #[test]
    fn test_simple_complexity_discount() {
        let signals = analyze("Paris is beautiful");
        assert_eq!(signals.complexity, Complexity::Simple);
        // (1.0 + 0.4) * 0.9
        assert!((signals.weight - 1.26).abs() < 1e-9);
    }

    // ==== TEST 4: long claims get the complexity bump ====
    #[test]
    fn test_complex_claims_get_bump() {
        let text = "the committee reviewed every proposal submitted during the spring \
                    session and found that most lacked sufficient supporting material";
        let signals = analyze(text);
        assert_eq!(signals.complexity, Complexity::Complex);
        assert!((signals.weight - 1.1).abs() < 1e-9);
    }

    // ==== TEST 5: weight never leaves [0.5, 2.0] ====
    #[test]
    fn test_weight_bounds() {
        let inputs = [
            "",
            "x",
            "The Apollo Program landed on the Moon on July 20, 1969 carrying three astronauts",
            "a b c d e f g h i j k l m n o p q r",
            "Nikola Tesla was born in 1856 and died in 1943 after decades of work on alternating current systems",
        ];
        for input in inputs {
            let w = analyze(input).weight;
            assert!((0.5..=2.0).contains(&w), "weight {} out of bounds for {:?}", w, input);
        }
    }

    // ==== TEST 6: checkable claims outrank vague ones of similar length ====
    #[test]
    fn test_specific_beats_vague() {
        let specific = analyze("Marie Curie won the Nobel Prize in 1903").weight;
        let vague = analyze("somebody won some prize at some point then").weight;
        assert!(
            specific > vague,
            "expected {} > {}",
            specific,
            vague
        );
    }

    // ==== TEST 7: date detection covers written-out forms ====
    #[test]
    fn test_month_day_year_counts_as_date() {
        let signals = analyze("the treaty was signed on January 3, 1988 in secret");
        assert!(signals.has_date);

        let signals = analyze("the treaty was signed on june 15 2004 quietly");
        assert!(signals.has_date, "month matching is case-insensitive");

        let signals = analyze("the artifact was catalogued in 1793 by curators");
        assert!(signals.has_number);
        assert!(!signals.has_date, "years outside 19xx/20xx are plain numbers");
    }

    // ==== TEST 8: simple-fact signal ====
    #[test]
    fn test_is_simple_fact() {
        assert!(is_simple_fact("Paris is the capital of France"));
        assert!(is_simple_fact("Water boils at 100 celsius"));
        assert!(!is_simple_fact("life finds a way"));
        assert!(!is_simple_fact(
            "The Eiffel Tower was completed in 1889 after two years of construction work in Paris"
        ));
    }
}
