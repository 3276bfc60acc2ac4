//! npm audit JSON adapter (SCA).

use std::collections::BTreeMap;

use serde::Deserialize;

use super::ReportError;
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
struct NpmAuditReport {
    vulnerabilities: BTreeMap<String, NpmVulnerability>,
}

#[derive(Debug, Deserialize)]
struct NpmVulnerability {
    name: Option<String>,
    severity: Option<String>,
    range: Option<String>,
    #[serde(default)]
    via: Vec<serde_json::Value>,
    #[serde(rename = "fixAvailable")]
    fix_available: Option<serde_json::Value>,
}

impl NpmVulnerability {
    /// First advisory title from the `via` chain, if any entry is an object
    fn advisory_title(&self) -> Option<String> {
        self.via.iter().find_map(|v| {
            v.get("title")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string())
        })
    }

    fn fix_version(&self) -> Option<String> {
        self.fix_available
            .as_ref()?
            .get("version")?
            .as_str()
            .map(|v| v.to_string())
    }
}

/// Parse an npm audit JSON report into canonical findings
pub fn parse_npm_audit(content: &str) -> Result<Vec<Finding>, ReportError> {
    let report: NpmAuditReport = serde_json::from_str(content).map_err(|e| {
        ReportError::new(Tool::NpmAudit, format!("expected vulnerabilities map: {e}"))
    })?;

    let mut findings = Vec::new();

    for (vuln_id, vuln) in &report.vulnerabilities {
        let package = vuln.name.clone().unwrap_or_else(|| vuln_id.clone());

        let severity = vuln
            .severity
            .as_deref()
            .and_then(Severity::from_str)
            .unwrap_or(Severity::Medium);

        let remediation = match vuln.fix_version() {
            Some(version) => format!("Update to version {version}"),
            None => "Update to latest".to_string(),
        };

        let mut finding = Finding::new(Tool::NpmAudit, &package)
            .with_severity(severity)
            .with_owasp("A06:2021 - Vulnerable and Outdated Components")
            .with_package(package.clone())
            .with_remediation(remediation)
            .with_description(vuln.advisory_title().unwrap_or_default());

        if let Some(range) = &vuln.range {
            finding = finding.with_version(range.clone());
        }

        findings.push(finding);
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    const SAMPLE_NPM_AUDIT: &str = r#"{
        "vulnerabilities": {
            "express": {
                "name": "express",
                "severity": "high",
                "range": "<4.19.2",
                "via": [{ "title": "express vulnerable to XSS via response.redirect()" }],
                "fixAvailable": { "version": "4.19.2" }
            }
        }
    }"#;

    #[test]
    fn test_parse_npm_audit() {
        let findings = parse_npm_audit(SAMPLE_NPM_AUDIT).unwrap();
        assert_eq!(findings.len(), 1);

        let f = &findings[0];
        assert_eq!(f.category, Category::Sca);
        assert_eq!(f.title, "express");
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.package, Some("express".to_string()));
        assert_eq!(f.version, Some("<4.19.2".to_string()));
        assert_eq!(f.remediation, Some("Update to version 4.19.2".to_string()));
        assert_eq!(
            f.owasp,
            Some("A06:2021 - Vulnerable and Outdated Components".to_string())
        );
    }

    #[test]
    fn test_via_strings_are_tolerated() {
        let report = r#"{"vulnerabilities": {"qs": {
            "name": "qs", "severity": "moderate", "via": ["express"], "fixAvailable": true
        }}}"#;
        let findings = parse_npm_audit(report).unwrap();
        assert_eq!(findings[0].severity, Severity::Medium);
        assert_eq!(findings[0].remediation, Some("Update to latest".to_string()));
    }
}
