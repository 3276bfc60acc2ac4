//! Scoring: lexical metrics, rubric judge, and per-model aggregation.

mod aggregate;
mod judge;
mod lexical;

pub use aggregate::{ComplianceCoverage, EvaluationDetails, ModelMetrics, StatSummary};
pub use judge::{parse_verdict, JudgeClient, JudgeConfig, JudgeError, RubricScores};
pub use lexical::{overlap_score, sequence_score, tokenize, ScoreError, DEFAULT_LCS_BETA};

use serde::Serialize;

/// Metric outputs for one matched policy pair. Immutable once computed.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreResult {
    /// Control id or positional label of the pair
    pub pair: String,
    /// N-gram overlap score in [0,1]
    pub overlap: f64,
    /// LCS-based sequence-similarity score in [0,1]
    pub sequence: f64,
    /// Rubric sub-scores, present when the judge succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rubric: Option<RubricScores>,
    /// Why the judge verdict is missing, when it was attempted and failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge_error: Option<String>,
}
