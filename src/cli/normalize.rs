//! `vulneval normalize` - raw reports directory to canonical dataset file.

use std::path::Path;

use anyhow::{Context, Result};

use vulneval::report::normalize_dir;

pub fn normalize_command(input: &Path, output: &Path) -> Result<()> {
    let outcome = normalize_dir(input)?;

    for warning in &outcome.warnings {
        println!("warning: {warning}");
    }

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(&outcome.dataset.to_output_json())
        .context("failed to serialize dataset")?;
    std::fs::write(output, json)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("{}", outcome.summary());
    println!("Dataset written to {}", output.display());

    let meta = outcome.dataset.metadata();
    for (severity, count) in &meta.by_severity {
        println!("  {severity:<10} {count}");
    }

    Ok(())
}
