//! Lexical overlap metrics between generated and reference policy text.
//!
//! Two pure, deterministic scores per pair:
//! - `overlap_score`: clipped n-gram precision for n = 1..4 combined by
//!   geometric mean with a brevity penalty, i.e. a document-level BLEU.
//! - `sequence_score`: longest-common-subsequence F-measure with recall
//!   weighted more heavily than precision (missing required policy content
//!   is worse than verbose phrasing), i.e. a ROUGE-L with beta > 1.

use std::collections::HashMap;

/// Recall weighting for the LCS F-measure
pub const DEFAULT_LCS_BETA: f64 = 1.2;

const MAX_NGRAM: usize = 4;

/// Scoring a pair against an empty reference is meaningless
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("reference text is empty: cannot score against nothing")]
    EmptyReference,
}

/// Lowercase alphanumeric tokenization, shared by both metrics
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts: HashMap<&[String], usize> = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_default() += 1;
        }
    }
    counts
}

/// Document-level n-gram overlap of `generated` against `reference`.
///
/// Returns a score in [0,1]. Empty generated text scores 0.0; an empty
/// reference is an error. Orders where the generated text is too short to
/// form any n-gram are skipped; a zero clipped count at any evaluated order
/// yields 0.0 (no smoothing).
pub fn overlap_score(generated: &str, reference: &str) -> Result<f64, ScoreError> {
    let ref_tokens = tokenize(reference);
    if ref_tokens.is_empty() {
        return Err(ScoreError::EmptyReference);
    }
    let gen_tokens = tokenize(generated);
    if gen_tokens.is_empty() {
        return Ok(0.0);
    }

    let mut log_sum = 0.0;
    let mut orders = 0usize;

    for n in 1..=MAX_NGRAM {
        let gen_grams = ngram_counts(&gen_tokens, n);
        if gen_grams.is_empty() {
            continue;
        }
        let ref_grams = ngram_counts(&ref_tokens, n);

        let total: usize = gen_grams.values().sum();
        let clipped: usize = gen_grams
            .iter()
            .map(|(gram, &count)| count.min(ref_grams.get(gram).copied().unwrap_or(0)))
            .sum();

        if clipped == 0 {
            return Ok(0.0);
        }
        log_sum += (clipped as f64 / total as f64).ln();
        orders += 1;
    }

    let precision = (log_sum / orders as f64).exp();

    // Brevity penalty when the candidate is shorter than the reference
    let gen_len = gen_tokens.len() as f64;
    let ref_len = ref_tokens.len() as f64;
    let bp = if gen_len < ref_len {
        (1.0 - ref_len / gen_len).exp()
    } else {
        1.0
    };

    Ok(precision * bp)
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    // Two-row DP
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for token_a in a {
        for (j, token_b) in b.iter().enumerate() {
            curr[j + 1] = if token_a == token_b {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// LCS-based sequence similarity of `generated` against `reference`.
///
/// F-measure of LCS-recall and LCS-precision with recall weighted by
/// `beta` (> 1 favors recall). Same edge-case contract as [`overlap_score`].
pub fn sequence_score(generated: &str, reference: &str, beta: f64) -> Result<f64, ScoreError> {
    let ref_tokens = tokenize(reference);
    if ref_tokens.is_empty() {
        return Err(ScoreError::EmptyReference);
    }
    let gen_tokens = tokenize(generated);
    if gen_tokens.is_empty() {
        return Ok(0.0);
    }

    let lcs = lcs_len(&gen_tokens, &ref_tokens) as f64;
    if lcs == 0.0 {
        return Ok(0.0);
    }

    let recall = lcs / ref_tokens.len() as f64;
    let precision = lcs / gen_tokens.len() as f64;
    let beta_sq = beta * beta;

    Ok((1.0 + beta_sq) * precision * recall / (recall + beta_sq * precision))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "Access to information and associated assets shall be \
        restricted in accordance with the access control policy.";

    #[test]
    fn test_identical_texts_score_one() {
        assert!((overlap_score(POLICY, POLICY).unwrap() - 1.0).abs() < 1e-9);
        assert!((sequence_score(POLICY, POLICY, DEFAULT_LCS_BETA).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_vocabulary_scores_zero() {
        let a = "alpha beta gamma delta";
        let b = "one two three four";
        assert_eq!(overlap_score(a, b).unwrap(), 0.0);
        assert_eq!(sequence_score(a, b, DEFAULT_LCS_BETA).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_generated_scores_zero() {
        assert_eq!(overlap_score("", POLICY).unwrap(), 0.0);
        assert_eq!(sequence_score("   ", POLICY, DEFAULT_LCS_BETA).unwrap(), 0.0);
    }

    #[test]
    fn test_empty_reference_is_error() {
        assert!(matches!(
            overlap_score(POLICY, ""),
            Err(ScoreError::EmptyReference)
        ));
        assert!(matches!(
            sequence_score(POLICY, " ", DEFAULT_LCS_BETA),
            Err(ScoreError::EmptyReference)
        ));
    }

    #[test]
    fn test_brevity_penalty_applies() {
        // Prefix of the reference: perfect precision, penalized for length
        let prefix = "access to information and associated assets";
        let full = overlap_score(POLICY, POLICY).unwrap();
        let short = overlap_score(prefix, POLICY).unwrap();
        assert!(short < full);
        assert!(short > 0.0);
    }

    #[test]
    fn test_scores_are_deterministic() {
        let candidate = "The organization shall restrict access to assets.";
        let a = overlap_score(candidate, POLICY).unwrap();
        let b = overlap_score(candidate, POLICY).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_recall_weighting() {
        // Generated covering all of the reference plus noise (recall 1)
        // should beat generated covering half of it exactly (precision 1),
        // because beta favors recall.
        let reference = "one two three four";
        let verbose = "one two three four five six";
        let partial = "one two";
        let verbose_score = sequence_score(verbose, reference, DEFAULT_LCS_BETA).unwrap();
        let partial_score = sequence_score(partial, reference, DEFAULT_LCS_BETA).unwrap();
        assert!(verbose_score > partial_score);
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        assert_eq!(
            tokenize("Access-control, per ISO/IEC 27001!"),
            vec!["access", "control", "per", "iso", "iec", "27001"]
        );
    }
}
