//! Per-model summary statistics over score results.
//!
//! Each dimension is aggregated independently over only the results where it
//! is present, so a judge-failed pair still contributes its lexical scores.
//! A rerun produces a fresh `ModelMetrics`; nothing here is mutated after
//! construction, and a metrics record never mixes models.

use serde::Serialize;

use super::{RubricScores, ScoreResult};
use crate::policy::PolicyRecord;

/// Mean, median, population standard deviation, min, and max of one scalar
/// dimension.
#[derive(Debug, Clone, Serialize)]
pub struct StatSummary {
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl StatSummary {
    /// `None` when no result carries the dimension.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).expect("scores are finite"));
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        };

        Some(Self {
            mean,
            median,
            std: variance.sqrt(),
            min: sorted[0],
            max: sorted[sorted.len() - 1],
        })
    }
}

/// Fraction of policies mentioning each compliance framework, as a
/// percentage. Presence ratio, not a quality judgment.
#[derive(Debug, Clone, Serialize)]
pub struct ComplianceCoverage {
    pub nist: f64,
    pub iso27001: f64,
    pub owasp: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationDetails {
    pub avg_length: f64,
    pub compliance_coverage: ComplianceCoverage,
}

/// Aggregate metrics for one model's evaluation run
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetrics {
    /// Generated policies loaded for the model
    pub policy_count: usize,
    /// Pairs that received lexical scores
    pub scored_count: usize,
    /// Pairs with a successful judge verdict
    pub judged_count: usize,
    /// Generated policies with no reference (excluded from denominators)
    pub unmatched_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alignment: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completeness: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actionability: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_accuracy: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linguistic_quality: Option<StatSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall: Option<StatSummary>,
    pub evaluation_details: EvaluationDetails,
}

fn rubric_dim(results: &[ScoreResult], f: impl Fn(&RubricScores) -> f64) -> Option<StatSummary> {
    let values: Vec<f64> = results
        .iter()
        .filter_map(|r| r.rubric.as_ref())
        .map(&f)
        .collect();
    StatSummary::compute(&values)
}

fn mentions_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}

fn coverage(policies: &[PolicyRecord]) -> (f64, ComplianceCoverage) {
    if policies.is_empty() {
        return (
            0.0,
            ComplianceCoverage {
                nist: 0.0,
                iso27001: 0.0,
                owasp: 0.0,
            },
        );
    }

    let mut total_words = 0usize;
    let (mut nist, mut iso, mut owasp) = (0usize, 0usize, 0usize);

    for record in policies {
        let text = record.policy.to_lowercase();
        total_words += text.split_whitespace().count();
        if mentions_any(&text, &["nist", "csf"]) {
            nist += 1;
        }
        if mentions_any(&text, &["iso", "27001"]) {
            iso += 1;
        }
        if text.contains("owasp") {
            owasp += 1;
        }
    }

    let n = policies.len() as f64;
    (
        total_words as f64 / n,
        ComplianceCoverage {
            nist: nist as f64 / n * 100.0,
            iso27001: iso as f64 / n * 100.0,
            owasp: owasp as f64 / n * 100.0,
        },
    )
}

impl ModelMetrics {
    /// Aggregate one model's score results. `policies` is the model's full
    /// generated collection (for coverage and counts); `unmatched_count` is
    /// how many of those never got a reference.
    pub fn from_results(
        policies: &[PolicyRecord],
        results: &[ScoreResult],
        unmatched_count: usize,
    ) -> Self {
        let overlap_values: Vec<f64> = results.iter().map(|r| r.overlap).collect();
        let sequence_values: Vec<f64> = results.iter().map(|r| r.sequence).collect();
        let (avg_length, compliance_coverage) = coverage(policies);

        Self {
            policy_count: policies.len(),
            scored_count: results.len(),
            judged_count: results.iter().filter(|r| r.rubric.is_some()).count(),
            unmatched_count,
            overlap: StatSummary::compute(&overlap_values),
            sequence: StatSummary::compute(&sequence_values),
            alignment: rubric_dim(results, |r| f64::from(r.alignment)),
            completeness: rubric_dim(results, |r| f64::from(r.completeness)),
            actionability: rubric_dim(results, |r| f64::from(r.actionability)),
            technical_accuracy: rubric_dim(results, |r| f64::from(r.technical_accuracy)),
            linguistic_quality: rubric_dim(results, |r| f64::from(r.linguistic_quality)),
            overall: rubric_dim(results, |r| r.overall),
            evaluation_details: EvaluationDetails {
                avg_length,
                compliance_coverage,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(overlap: f64, sequence: f64, rubric: Option<RubricScores>) -> ScoreResult {
        ScoreResult {
            pair: "A.5.1".to_string(),
            overlap,
            sequence,
            rubric,
            judge_error: None,
        }
    }

    fn rubric(score: u8) -> RubricScores {
        RubricScores {
            alignment: score,
            completeness: score,
            actionability: score,
            technical_accuracy: score,
            linguistic_quality: score,
            overall: f64::from(score),
        }
    }

    fn policy(text: &str) -> PolicyRecord {
        PolicyRecord {
            control_id: None,
            policy: text.to_string(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_all_equal_values() {
        let summary = StatSummary::compute(&[0.5, 0.5, 0.5, 0.5]).unwrap();
        assert_eq!(summary.mean, 0.5);
        assert_eq!(summary.median, 0.5);
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.min, 0.5);
        assert_eq!(summary.max, 0.5);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(StatSummary::compute(&[1.0, 3.0]).unwrap().median, 2.0);
        assert_eq!(StatSummary::compute(&[3.0, 1.0, 2.0]).unwrap().median, 2.0);
    }

    #[test]
    fn test_population_std() {
        // Population std of [1, 3] is 1
        let summary = StatSummary::compute(&[1.0, 3.0]).unwrap();
        assert!((summary.std - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_dimension_is_none() {
        assert!(StatSummary::compute(&[]).is_none());
    }

    #[test]
    fn test_judge_dimensions_only_over_present_results() {
        let results = vec![
            result(0.4, 0.5, Some(rubric(80))),
            result(0.6, 0.7, None),
        ];
        let metrics = ModelMetrics::from_results(&[policy("a"), policy("b")], &results, 0);

        assert_eq!(metrics.scored_count, 2);
        assert_eq!(metrics.judged_count, 1);
        assert_eq!(metrics.overlap.as_ref().unwrap().mean, 0.5);
        // Only the judged pair feeds rubric stats
        assert_eq!(metrics.alignment.as_ref().unwrap().mean, 80.0);
        assert_eq!(metrics.alignment.as_ref().unwrap().std, 0.0);
    }

    #[test]
    fn test_compliance_coverage_presence_ratio() {
        let policies = vec![
            policy("Aligned with NIST CSF and ISO 27001 controls."),
            policy("Mitigates the OWASP Top 10 risks."),
        ];
        let metrics = ModelMetrics::from_results(&policies, &[], 0);

        let coverage = &metrics.evaluation_details.compliance_coverage;
        assert_eq!(coverage.nist, 50.0);
        assert_eq!(coverage.iso27001, 50.0);
        assert_eq!(coverage.owasp, 50.0);
        assert!(metrics.evaluation_details.avg_length > 0.0);
    }
}
