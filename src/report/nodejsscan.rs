//! NodeJsScan JSON adapter.
//!
//! NodeJsScan groups findings under `sec_issues` keyed by category name;
//! categories double as CWE lookup keys.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::{map_owasp, ReportError};
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
struct NodeJsScanReport {
    sec_issues: BTreeMap<String, Vec<NodeJsScanIssue>>,
}

#[derive(Debug, Deserialize)]
struct NodeJsScanIssue {
    title: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    path: Option<String>,
    line: Option<u32>,
    solution: Option<String>,
}

/// Category-name to CWE table for issues that carry no CWE of their own.
static CATEGORY_CWE: &[(&str, &str)] = &[
    ("SQL Injection", "CWE-89"),
    ("XSS", "CWE-79"),
    ("Path Traversal", "CWE-22"),
    ("Command Injection", "CWE-78"),
    ("Insecure Deserialization", "CWE-502"),
    ("Broken Authentication", "CWE-287"),
    ("Sensitive Data Exposure", "CWE-200"),
    ("XXE", "CWE-611"),
    ("Broken Access Control", "CWE-284"),
    ("Security Misconfiguration", "CWE-16"),
];

fn category_cwe(category: &str) -> Option<&'static str> {
    CATEGORY_CWE
        .iter()
        .find(|(name, _)| category.contains(name))
        .map(|(_, cwe)| *cwe)
}

/// Parse a NodeJsScan JSON report into canonical findings
pub fn parse_nodejsscan(content: &str) -> Result<Vec<Finding>, ReportError> {
    let report: NodeJsScanReport = serde_json::from_str(content)
        .map_err(|e| ReportError::new(Tool::NodeJsScan, format!("expected sec_issues map: {e}")))?;

    let mut findings = Vec::new();

    for (category, issues) in &report.sec_issues {
        for issue in issues {
            let title = issue.title.clone().unwrap_or_else(|| category.clone());

            let severity = issue
                .severity
                .as_deref()
                .and_then(Severity::from_str)
                .unwrap_or(Severity::Medium);

            let mut finding = Finding::new(Tool::NodeJsScan, &title)
                .with_severity(severity)
                .with_owasp(map_owasp(category))
                .with_description(issue.description.clone().unwrap_or_default());

            if let Some(cwe) = category_cwe(category) {
                finding = finding.with_cwe(cwe);
            }
            if let Some(path) = &issue.path {
                finding = finding.with_file(path.clone());
            }
            if let Some(line) = issue.line {
                finding = finding.with_line(line);
            }
            if let Some(solution) = &issue.solution {
                if !solution.is_empty() {
                    finding = finding.with_remediation(solution.clone());
                }
            }

            findings.push(finding);
        }
    }

    Ok(findings)
}
