//! Evaluation run: match, score, judge, aggregate for one model.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Result;

use crate::policy::{match_collections, PolicyCollection};
use crate::score::{
    overlap_score, sequence_score, JudgeClient, JudgeError, ModelMetrics, ScoreResult,
};

/// Outcome of evaluating one model against the reference collection
#[derive(Debug)]
pub struct ModelEvaluation {
    pub model: String,
    pub metrics: ModelMetrics,
    pub results: Vec<ScoreResult>,
}

/// Evaluate one generated collection against the reference collection.
///
/// Lexical scoring is pure and per-pair; a pair whose reference text is
/// empty fails alone and is excluded from denominators. When a judge client
/// is given, every lexically-scored pair is judged with bounded concurrency;
/// judge failures are recorded on the pair, never propagated.
pub async fn evaluate_model(
    generated: &PolicyCollection,
    reference: &PolicyCollection,
    beta: f64,
    judge: Option<Arc<JudgeClient>>,
    cancel: Arc<AtomicBool>,
) -> Result<ModelEvaluation> {
    let outcome = match_collections(generated, reference);
    tracing::info!(
        "{}: {} pairs, {} unmatched",
        generated.model,
        outcome.pairs.len(),
        outcome.unmatched.len()
    );

    // Lexical pass, in pair order
    let mut scorable = Vec::new();
    let mut results = Vec::new();
    for (i, pair) in outcome.pairs.iter().enumerate() {
        let label = pair.label(i);
        let scored = overlap_score(&pair.generated.policy, &pair.reference.policy).and_then(
            |overlap| {
                sequence_score(&pair.generated.policy, &pair.reference.policy, beta)
                    .map(|sequence| (overlap, sequence))
            },
        );
        let (overlap, sequence) = match scored {
            Ok(pair_scores) => pair_scores,
            Err(e) => {
                tracing::warn!("{}: pair {label} not scored: {e}", generated.model);
                continue;
            }
        };

        scorable.push(pair.clone());
        results.push(ScoreResult {
            pair: label,
            overlap,
            sequence,
            rubric: None,
            judge_error: None,
        });
    }

    // Judge pass, bounded concurrency, results restored to pair order
    if let Some(judge) = judge {
        let verdicts = judge.judge_pairs(&scorable, cancel).await;
        for (result, verdict) in results.iter_mut().zip(verdicts) {
            match verdict {
                Ok(scores) => result.rubric = Some(scores),
                Err(JudgeError::Cancelled) => {
                    result.judge_error = Some("cancelled".to_string());
                }
                Err(e) => {
                    tracing::warn!("{}: pair {} judge-failed: {e}", generated.model, result.pair);
                    result.judge_error = Some(e.to_string());
                }
            }
        }
    }

    let metrics = ModelMetrics::from_results(
        &generated.policies,
        &results,
        outcome.unmatched.len(),
    );

    Ok(ModelEvaluation {
        model: generated.model.clone(),
        metrics,
        results,
    })
}
