//! Cross-tool dedup and merge of normalized findings.
//!
//! Two findings are duplicates when they share the same normalized title,
//! the same location key (file path, or target URL for pathless DAST
//! findings), and severities within [`SEVERITY_TIER_TOLERANCE`] tiers.
//! Duplicates merge into one finding keeping the highest severity, the union
//! of contributing tools, and classification/location data from the
//! highest-priority tool (static before dependency before dynamic scanners).

use std::collections::HashMap;

use crate::model::{Finding, Tool};

/// Maximum severity-tier distance at which two otherwise-equal findings are
/// still considered the same observation.
pub const SEVERITY_TIER_TOLERANCE: u8 = 0;

fn best_tool(finding: &Finding) -> Tool {
    finding
        .tools
        .iter()
        .copied()
        .min_by_key(|t| t.priority())
        .expect("finding always has at least one tool")
}

fn within_tolerance(a: &Finding, b: &Finding) -> bool {
    a.severity.tier().abs_diff(b.severity.tier()) <= SEVERITY_TIER_TOLERANCE
}

/// Merge `incoming` into the already-kept `kept` finding.
fn merge_into(kept: &mut Finding, incoming: Finding) {
    // Priorities must be taken before the tool union below mutates `kept`
    let kept_priority = best_tool(kept).priority();
    let incoming_priority = best_tool(&incoming).priority();
    let incoming_wins = incoming_priority < kept_priority;

    // Union of tools, arrival order preserved
    for tool in &incoming.tools {
        if !kept.tools.contains(tool) {
            kept.tools.push(*tool);
        }
    }

    kept.severity = kept.severity.max(incoming.severity);

    // One CWE/OWASP tag survives: first non-empty in tool-priority order
    if kept.cwe.is_none() || (incoming_wins && incoming.cwe.is_some()) {
        kept.cwe = incoming.cwe.or(kept.cwe.take());
    }
    if kept.owasp.is_none() || (incoming_wins && incoming.owasp.is_some()) {
        kept.owasp = incoming.owasp.or(kept.owasp.take());
    }

    // Location from the highest-priority contributor
    if kept.file.is_none() || (incoming_wins && incoming.file.is_some()) {
        kept.file = incoming.file;
        kept.line = incoming.line;
    }
    if kept.url.is_none() {
        kept.url = incoming.url;
    }
    if kept.remediation.is_none() {
        kept.remediation = incoming.remediation;
    }
    if kept.description.is_empty() {
        kept.description = incoming.description;
    }
}

/// Deduplicate findings, preserving arrival order of first occurrence.
///
/// Deterministic: identical input order yields identical output.
pub fn merge_findings(findings: Vec<Finding>) -> Vec<Finding> {
    let mut merged: Vec<Finding> = Vec::with_capacity(findings.len());
    // (normalized title, location key) -> indexes into `merged`
    let mut index: HashMap<(String, String), Vec<usize>> = HashMap::new();

    for finding in findings {
        let key = (
            finding.normalized_title(),
            finding.location_key().to_string(),
        );

        let slot = index.entry(key).or_default();
        let existing = slot
            .iter()
            .copied()
            .find(|&i| within_tolerance(&merged[i], &finding));

        match existing {
            Some(i) => merge_into(&mut merged[i], finding),
            None => {
                merged.push(finding);
                slot.push(merged.len() - 1);
            }
        }
    }

    merged
}
