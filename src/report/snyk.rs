//! Snyk JSON adapter (SCA).
//!
//! Snyk emits a single project object or a list of projects depending on how
//! the scan was invoked; both shapes are accepted.

use serde::Deserialize;

use super::ReportError;
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SnykReport {
    Single(SnykProject),
    Multi(Vec<SnykProject>),
}

#[derive(Debug, Deserialize)]
struct SnykProject {
    #[serde(default)]
    vulnerabilities: Vec<SnykVulnerability>,
}

#[derive(Debug, Deserialize)]
struct SnykVulnerability {
    id: Option<String>,
    title: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    #[serde(rename = "packageName")]
    package_name: Option<String>,
    #[serde(rename = "moduleName")]
    module_name: Option<String>,
    version: Option<String>,
    #[serde(rename = "fixedIn", default)]
    fixed_in: Vec<String>,
    identifiers: Option<SnykIdentifiers>,
}

#[derive(Debug, Deserialize)]
struct SnykIdentifiers {
    #[serde(rename = "CWE", default)]
    cwe: Vec<String>,
}

/// Parse a Snyk JSON report into canonical findings
pub fn parse_snyk(content: &str) -> Result<Vec<Finding>, ReportError> {
    let report: SnykReport = serde_json::from_str(content).map_err(|e| {
        ReportError::new(Tool::Snyk, format!("expected project or project list: {e}"))
    })?;

    let projects = match &report {
        SnykReport::Single(p) => std::slice::from_ref(p),
        SnykReport::Multi(ps) => ps.as_slice(),
    };

    let mut findings = Vec::new();

    for project in projects {
        for vuln in &project.vulnerabilities {
            let title = vuln
                .title
                .clone()
                .or_else(|| vuln.id.clone())
                .unwrap_or_else(|| "Unknown".to_string());

            let severity = vuln
                .severity
                .as_deref()
                .and_then(Severity::from_str)
                .unwrap_or(Severity::Medium);

            let remediation = if vuln.fixed_in.is_empty() {
                "Review Snyk recommendations".to_string()
            } else {
                format!("Upgrade to {}", vuln.fixed_in.join(", "))
            };

            // Truncate long advisory bodies the way the dataset expects
            let description = vuln
                .description
                .as_deref()
                .map(|d| d.chars().take(200).collect::<String>())
                .unwrap_or_default();

            let mut finding = Finding::new(Tool::Snyk, &title)
                .with_severity(severity)
                .with_owasp("A06:2021 - Vulnerable and Outdated Components")
                .with_remediation(remediation)
                .with_description(description);

            if let Some(package) = vuln.package_name.clone().or_else(|| vuln.module_name.clone()) {
                finding = finding.with_package(package);
            }
            if let Some(version) = &vuln.version {
                finding = finding.with_version(version.clone());
            }
            if let Some(cwe) = vuln
                .identifiers
                .as_ref()
                .and_then(|i| i.cwe.first())
                .filter(|c| !c.is_empty())
            {
                finding = finding.with_cwe(cwe.clone());
            }

            findings.push(finding);
        }
    }

    Ok(findings)
}
