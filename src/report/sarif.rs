//! CodeQL SARIF adapter.
//!
//! SARIF is the interchange format CodeQL emits. We map `runs[].results[]`
//! to canonical findings: severity from the result `level` (falling back to
//! the rule's default configuration), CWE from rule/result property tags,
//! location from the first physical location.
//!
//! Spec: https://docs.oasis-open.org/sarif/sarif/v2.1.0/sarif-v2.1.0.html

use std::collections::HashMap;

use serde::Deserialize;

use super::{extract_cwe, map_owasp, rule_id_to_title, ReportError};
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
struct Sarif {
    runs: Vec<SarifRun>,
}

#[derive(Debug, Deserialize)]
struct SarifRun {
    #[serde(default)]
    tool: Option<SarifTool>,
    results: Option<Vec<SarifResultItem>>,
}

#[derive(Debug, Deserialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Deserialize)]
struct SarifDriver {
    rules: Option<Vec<SarifRule>>,
}

#[derive(Debug, Deserialize)]
struct SarifRule {
    id: String,
    name: Option<String>,
    #[serde(rename = "shortDescription")]
    short_description: Option<SarifMessage>,
    #[serde(rename = "fullDescription")]
    full_description: Option<SarifMessage>,
    #[serde(rename = "defaultConfiguration")]
    default_configuration: Option<SarifConfiguration>,
    properties: Option<SarifRuleProperties>,
}

#[derive(Debug, Deserialize)]
struct SarifRuleProperties {
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct SarifConfiguration {
    level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SarifMessage {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SarifResultItem {
    #[serde(rename = "ruleId")]
    rule_id: Option<String>,
    level: Option<String>,
    message: Option<SarifMessage>,
    locations: Option<Vec<SarifLocation>>,
}

#[derive(Debug, Deserialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: Option<SarifPhysicalLocation>,
}

#[derive(Debug, Deserialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: Option<SarifArtifactLocation>,
    region: Option<SarifRegion>,
}

#[derive(Debug, Deserialize)]
struct SarifArtifactLocation {
    uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: Option<u32>,
}

/// CodeQL severity table: SARIF `level` -> canonical severity.
fn map_codeql_level(level: &str) -> Option<Severity> {
    match level.to_lowercase().as_str() {
        "error" => Some(Severity::High),
        "warning" => Some(Severity::Medium),
        "note" => Some(Severity::Low),
        "none" => Some(Severity::Info),
        _ => None,
    }
}

/// Parse a CodeQL SARIF report into canonical findings
pub fn parse_codeql_sarif(content: &str) -> Result<Vec<Finding>, ReportError> {
    let sarif: Sarif = serde_json::from_str(content)
        .map_err(|e| ReportError::new(Tool::CodeQl, format!("expected SARIF with runs[]: {e}")))?;

    let mut findings = Vec::new();

    for run in &sarif.runs {
        // Build rule lookup for severity/CWE fallbacks
        let rules: HashMap<&str, &SarifRule> = run
            .tool
            .as_ref()
            .and_then(|t| t.driver.rules.as_ref())
            .map(|rules| rules.iter().map(|r| (r.id.as_str(), r)).collect())
            .unwrap_or_default();

        let results = match &run.results {
            Some(r) => r,
            None => continue,
        };

        for item in results {
            let rule_id = match &item.rule_id {
                Some(id) => id.as_str(),
                None => continue,
            };
            let rule = rules.get(rule_id);

            let title = rule
                .and_then(|r| r.name.clone())
                .or_else(|| {
                    rule.and_then(|r| r.short_description.as_ref())
                        .and_then(|d| d.text.clone())
                })
                .unwrap_or_else(|| rule_id_to_title(rule_id));

            let severity = item
                .level
                .as_deref()
                .or_else(|| {
                    rule.and_then(|r| r.default_configuration.as_ref())
                        .and_then(|c| c.level.as_deref())
                })
                .and_then(map_codeql_level)
                .unwrap_or(Severity::Medium);

            let cwe = rule
                .and_then(|r| r.properties.as_ref())
                .and_then(|p| p.tags.as_ref())
                .and_then(|tags| tags.iter().find_map(|t| extract_cwe(t)))
                .or_else(|| extract_cwe(rule_id));

            let description = item
                .message
                .as_ref()
                .and_then(|m| m.text.clone())
                .or_else(|| {
                    rule.and_then(|r| r.full_description.as_ref())
                        .and_then(|d| d.text.clone())
                })
                .unwrap_or_default();

            let mut finding = Finding::new(Tool::CodeQl, &title)
                .with_severity(severity)
                .with_owasp(map_owasp(&title))
                .with_description(description);

            if let Some(cwe) = cwe {
                finding = finding.with_cwe(cwe);
            }

            if let Some(loc) = item
                .locations
                .as_ref()
                .and_then(|locs| locs.first())
                .and_then(|l| l.physical_location.as_ref())
            {
                if let Some(uri) = loc.artifact_location.as_ref().and_then(|a| a.uri.clone()) {
                    finding = finding.with_file(uri);
                }
                if let Some(line) = loc.region.as_ref().and_then(|r| r.start_line) {
                    finding = finding.with_line(line);
                }
            }

            findings.push(finding);
        }
    }

    Ok(findings)
}
