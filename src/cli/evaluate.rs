//! `vulneval evaluate` - score generated policy collections against the
//! reference collection and write per-model metrics.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use vulneval::evaluate::{evaluate_model, ModelEvaluation};
use vulneval::policy::{PolicyCollection, REFERENCE_MODEL};
use vulneval::score::JudgeClient;
use vulneval::Config;

/// Derive the model name from a `<model>_policies.json` file stem
fn model_name(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    Some(stem.strip_suffix("_policies").unwrap_or(stem).to_string())
}

fn load_generated(dir: &Path, only: &[String]) -> Result<Vec<PolicyCollection>> {
    let pattern = dir.join("*_policies.json");
    let mut collections = Vec::new();

    for entry in glob::glob(&pattern.to_string_lossy())?.flatten() {
        let Some(model) = model_name(&entry) else {
            continue;
        };
        if !only.is_empty() && !only.contains(&model) {
            continue;
        }
        collections.push(PolicyCollection::load(&entry, model)?);
    }

    if collections.is_empty() {
        bail!("no *_policies.json files found in {}", dir.display());
    }
    Ok(collections)
}

fn print_summary(evaluations: &[ModelEvaluation]) {
    println!("\n{}", "=".repeat(60));
    println!("POLICY EVALUATION SUMMARY");
    println!("{}", "=".repeat(60));

    for evaluation in evaluations {
        let m = &evaluation.metrics;
        println!("\n{}", evaluation.model.to_uppercase());
        println!("{}", "-".repeat(40));
        if let Some(overlap) = &m.overlap {
            println!("Overlap:   {:.4} (±{:.4})", overlap.mean, overlap.std);
        }
        if let Some(sequence) = &m.sequence {
            println!("Sequence:  {:.4} (±{:.4})", sequence.mean, sequence.std);
        }
        if let Some(overall) = &m.overall {
            println!("Judge:     {:.1}/100 over {} pairs", overall.mean, m.judged_count);
        }
        println!(
            "Policies:  {} ({} scored, {} unmatched)",
            m.policy_count, m.scored_count, m.unmatched_count
        );

        let coverage = &m.evaluation_details.compliance_coverage;
        println!("Compliance coverage:");
        println!("  NIST CSF:  {:.1}%", coverage.nist);
        println!("  ISO 27001: {:.1}%", coverage.iso27001);
        println!("  OWASP:     {:.1}%", coverage.owasp);
    }
    println!();
}

pub async fn evaluate_command(
    work_dir: &Path,
    generated_dir: &Path,
    reference_file: &Path,
    output: &Path,
    judge: bool,
    models: &[String],
) -> Result<()> {
    let config = Config::load(work_dir)?;

    let reference = PolicyCollection::load(reference_file, REFERENCE_MODEL)?;
    if reference.is_empty() {
        bail!("reference collection {} is empty", reference_file.display());
    }
    let generated = load_generated(generated_dir, models)?;

    let judge_client = if judge {
        let api_key = config.api_key().with_context(|| {
            format!(
                "--judge requires an API key in ${} or ~/.vulneval/api_key",
                config.judge.api_key_env
            )
        })?;
        Some(Arc::new(JudgeClient::new(config.judge.clone(), api_key)))
    } else {
        None
    };

    // Ctrl-C abandons remaining judge calls; completed scores still aggregate
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupt received, abandoning remaining judge calls");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let mut evaluations = Vec::new();
    for collection in &generated {
        let evaluation = evaluate_model(
            collection,
            &reference,
            config.evaluate.beta,
            judge_client.clone(),
            Arc::clone(&cancel),
        )
        .await?;
        evaluations.push(evaluation);
    }

    if evaluations.iter().all(|e| e.results.is_empty()) {
        bail!("no policy pairs could be scored for any model");
    }

    let mut output_map = BTreeMap::new();
    for evaluation in &evaluations {
        output_map.insert(
            evaluation.model.clone(),
            serde_json::json!({
                "metrics": evaluation.metrics,
                "scores": evaluation.results,
            }),
        );
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&output_map).context("failed to serialize metrics")?;
    std::fs::write(output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;

    print_summary(&evaluations);
    println!("Metrics written to {}", output.display());

    Ok(())
}
