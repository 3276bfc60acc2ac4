//! Canonical vulnerability dataset with aggregate counts.

use std::collections::BTreeMap;

use serde::Serialize;

use super::Finding;

/// Aggregate counts over a dataset. Field names are stable across runs so
/// downstream tooling can rely on them.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetMetadata {
    pub generated_at: String,
    pub total_vulnerabilities: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub by_tool: BTreeMap<String, usize>,
}

/// Ordered sequence of deduplicated findings.
///
/// Counts are recomputed from the finding list on every call, never cached,
/// so the totals always equal the sequence length.
#[derive(Debug, Clone, Serialize)]
pub struct VulnerabilityDataset {
    pub vulnerabilities: Vec<Finding>,
}

impl VulnerabilityDataset {
    pub fn new(vulnerabilities: Vec<Finding>) -> Self {
        Self { vulnerabilities }
    }

    pub fn len(&self) -> usize {
        self.vulnerabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vulnerabilities.is_empty()
    }

    pub fn metadata(&self) -> DatasetMetadata {
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_category: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_tool: BTreeMap<String, usize> = BTreeMap::new();

        for finding in &self.vulnerabilities {
            *by_severity
                .entry(finding.severity.as_str().to_string())
                .or_default() += 1;
            *by_category
                .entry(finding.category.as_str().to_string())
                .or_default() += 1;
            for tool in &finding.tools {
                *by_tool.entry(tool.as_str().to_string()).or_default() += 1;
            }
        }

        DatasetMetadata {
            generated_at: chrono::Utc::now().to_rfc3339(),
            total_vulnerabilities: self.vulnerabilities.len(),
            by_severity,
            by_category,
            by_tool,
        }
    }

    /// Serialize as the canonical output file shape:
    /// `{ "metadata": ..., "vulnerabilities": [...] }`
    pub fn to_output_json(&self) -> serde_json::Value {
        serde_json::json!({
            "metadata": self.metadata(),
            "vulnerabilities": self.vulnerabilities,
        })
    }
}
