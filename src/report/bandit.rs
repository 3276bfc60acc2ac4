//! Bandit JSON adapter.

use serde::Deserialize;

use super::{map_owasp, ReportError};
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
struct BanditReport {
    results: Vec<BanditResult>,
}

#[derive(Debug, Deserialize)]
struct BanditResult {
    test_name: Option<String>,
    issue_severity: Option<String>,
    issue_text: Option<String>,
    filename: Option<String>,
    line_number: Option<u32>,
    issue_cwe: Option<BanditCwe>,
}

#[derive(Debug, Deserialize)]
struct BanditCwe {
    id: Option<u32>,
}

/// Bandit severity table: issue_severity -> canonical severity.
fn map_bandit_severity(severity: &str) -> Option<Severity> {
    match severity.to_uppercase().as_str() {
        "HIGH" => Some(Severity::High),
        "MEDIUM" => Some(Severity::Medium),
        "LOW" => Some(Severity::Low),
        _ => None,
    }
}

/// Parse a Bandit JSON report into canonical findings
pub fn parse_bandit(content: &str) -> Result<Vec<Finding>, ReportError> {
    let report: BanditReport = serde_json::from_str(content)
        .map_err(|e| ReportError::new(Tool::Bandit, format!("expected results[]: {e}")))?;

    let mut findings = Vec::new();

    for result in &report.results {
        let title = result.test_name.clone().unwrap_or_else(|| "Unknown".to_string());

        let severity = result
            .issue_severity
            .as_deref()
            .and_then(map_bandit_severity)
            .unwrap_or(Severity::Medium);

        let mut finding = Finding::new(Tool::Bandit, &title)
            .with_severity(severity)
            .with_owasp(map_owasp(&title))
            .with_description(result.issue_text.clone().unwrap_or_default());

        if let Some(id) = result.issue_cwe.as_ref().and_then(|c| c.id) {
            finding = finding.with_cwe(format!("CWE-{id}"));
        }
        if let Some(filename) = &result.filename {
            finding = finding.with_file(filename.clone());
        }
        if let Some(line) = result.line_number {
            finding = finding.with_line(line);
        }

        findings.push(finding);
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_BANDIT: &str = r#"{
        "results": [{
            "test_name": "hardcoded_sql_expressions",
            "issue_severity": "MEDIUM",
            "issue_text": "Possible SQL injection vector through string-based query construction.",
            "filename": "app/db.py",
            "line_number": 112,
            "issue_cwe": { "id": 89, "link": "https://cwe.mitre.org/data/definitions/89.html" }
        }]
    }"#;

    #[test]
    fn test_parse_bandit() {
        let findings = parse_bandit(SAMPLE_BANDIT).unwrap();
        assert_eq!(findings.len(), 1);

        let f = &findings[0];
        assert_eq!(f.tools, vec![Tool::Bandit]);
        assert_eq!(f.severity, Severity::Medium);
        assert_eq!(f.cwe, Some("CWE-89".to_string()));
        assert_eq!(f.file, Some("app/db.py".to_string()));
        assert_eq!(f.line, Some(112));
    }

    #[test]
    fn test_malformed_bandit() {
        assert!(parse_bandit("[]").is_err());
    }
}
