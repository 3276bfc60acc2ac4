//! Semgrep JSON adapter.

use serde::Deserialize;

use super::{extract_cwe, map_owasp, rule_id_to_title, ReportError};
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
struct SemgrepReport {
    results: Vec<SemgrepResult>,
}

#[derive(Debug, Deserialize)]
struct SemgrepResult {
    check_id: Option<String>,
    path: Option<String>,
    start: Option<SemgrepPosition>,
    #[serde(default)]
    extra: SemgrepExtra,
}

#[derive(Debug, Deserialize)]
struct SemgrepPosition {
    line: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SemgrepExtra {
    severity: Option<String>,
    message: Option<String>,
    fix: Option<String>,
    metadata: Option<SemgrepMetadata>,
}

#[derive(Debug, Deserialize)]
struct SemgrepMetadata {
    cwe: Option<serde_json::Value>,
}

/// Semgrep severity table: rule severity -> canonical severity.
fn map_semgrep_severity(severity: &str) -> Option<Severity> {
    match severity.to_uppercase().as_str() {
        "ERROR" | "CRITICAL" | "HIGH" => Some(Severity::High),
        "WARNING" | "MEDIUM" => Some(Severity::Medium),
        "LOW" => Some(Severity::Low),
        "INFO" => Some(Severity::Info),
        _ => None,
    }
}

/// Parse a Semgrep JSON report into canonical findings
pub fn parse_semgrep(content: &str) -> Result<Vec<Finding>, ReportError> {
    let report: SemgrepReport = serde_json::from_str(content)
        .map_err(|e| ReportError::new(Tool::Semgrep, format!("expected results[]: {e}")))?;

    let mut findings = Vec::new();

    for result in &report.results {
        let check_id = result.check_id.as_deref().unwrap_or("unknown");
        let title = rule_id_to_title(check_id);

        let severity = result
            .extra
            .severity
            .as_deref()
            .and_then(map_semgrep_severity)
            .unwrap_or(Severity::Medium);

        // CWE lives either in metadata (string or list) or in the check id
        let cwe = result
            .extra
            .metadata
            .as_ref()
            .and_then(|m| m.cwe.as_ref())
            .and_then(|v| match v {
                serde_json::Value::String(s) => extract_cwe(s),
                serde_json::Value::Array(items) => items
                    .iter()
                    .filter_map(|i| i.as_str())
                    .find_map(extract_cwe),
                _ => None,
            })
            .or_else(|| extract_cwe(check_id));

        let mut finding = Finding::new(Tool::Semgrep, &title)
            .with_severity(severity)
            .with_owasp(map_owasp(&title))
            .with_description(result.extra.message.clone().unwrap_or_default());

        if let Some(cwe) = cwe {
            finding = finding.with_cwe(cwe);
        }
        if let Some(path) = &result.path {
            finding = finding.with_file(path.clone());
        }
        if let Some(line) = result.start.as_ref().and_then(|s| s.line) {
            finding = finding.with_line(line);
        }
        if let Some(fix) = &result.extra.fix {
            finding = finding.with_remediation(fix.clone());
        }

        findings.push(finding);
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SEMGREP: &str = r#"{
        "results": [{
            "check_id": "javascript.express.security.audit.sqli.node-sqli",
            "path": "src/routes/search.js",
            "start": { "line": 45, "col": 3 },
            "extra": {
                "severity": "ERROR",
                "message": "Detected SQL statement built from user input",
                "fix": "Use parameterized queries",
                "metadata": { "cwe": ["CWE-89: Improper Neutralization"] }
            }
        }]
    }"#;

    #[test]
    fn test_parse_semgrep() {
        let findings = parse_semgrep(SAMPLE_SEMGREP).unwrap();
        assert_eq!(findings.len(), 1);

        let f = &findings[0];
        assert_eq!(f.title, "Node Sqli");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.cwe, Some("CWE-89".to_string()));
        assert_eq!(f.file, Some("src/routes/search.js".to_string()));
        assert_eq!(f.line, Some(45));
        assert_eq!(f.remediation, Some("Use parameterized queries".to_string()));
    }

    #[test]
    fn test_malformed_semgrep() {
        assert!(parse_semgrep(r#"{"no_results": true}"#).is_err());
        assert!(parse_semgrep("not json").is_err());
    }

    #[test]
    fn test_missing_severity_defaults_to_medium() {
        let report = r#"{"results": [{"check_id": "x.y.rule", "path": "a.js"}]}"#;
        let findings = parse_semgrep(report).unwrap();
        assert_eq!(findings[0].severity, Severity::Medium);
    }
}
