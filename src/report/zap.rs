//! OWASP ZAP JSON adapter (DAST).

use serde::Deserialize;

use super::{map_owasp, ReportError};
use crate::model::{Finding, Severity, Tool};

#[derive(Debug, Deserialize)]
struct ZapReport {
    site: Vec<ZapSite>,
}

#[derive(Debug, Deserialize)]
struct ZapSite {
    #[serde(default)]
    alerts: Vec<ZapAlert>,
}

#[derive(Debug, Deserialize)]
struct ZapAlert {
    name: Option<String>,
    riskcode: Option<serde_json::Value>,
    desc: Option<String>,
    solution: Option<String>,
    cweid: Option<serde_json::Value>,
    #[serde(default)]
    instances: Vec<ZapInstance>,
}

#[derive(Debug, Deserialize)]
struct ZapInstance {
    uri: Option<String>,
}

/// ZAP severity table: riskcode -> canonical severity.
fn map_zap_risk(risk_code: &str) -> Option<Severity> {
    match risk_code {
        "3" => Some(Severity::High),
        "2" => Some(Severity::Medium),
        "1" => Some(Severity::Low),
        "0" => Some(Severity::Info),
        _ => None,
    }
}

/// ZAP emits riskcode/cweid as either strings or numbers
fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parse an OWASP ZAP JSON report into canonical findings
pub fn parse_zap(content: &str) -> Result<Vec<Finding>, ReportError> {
    let report: ZapReport = serde_json::from_str(content)
        .map_err(|e| ReportError::new(Tool::Zap, format!("expected site[] with alerts: {e}")))?;

    let mut findings = Vec::new();

    for site in &report.site {
        for alert in &site.alerts {
            let title = alert.name.clone().unwrap_or_else(|| "Unknown".to_string());

            let severity = alert
                .riskcode
                .as_ref()
                .and_then(value_to_string)
                .as_deref()
                .and_then(map_zap_risk)
                .unwrap_or(Severity::Medium);

            let mut finding = Finding::new(Tool::Zap, &title)
                .with_severity(severity)
                .with_owasp(map_owasp(&title))
                .with_description(alert.desc.clone().unwrap_or_default());

            if let Some(cweid) = alert.cweid.as_ref().and_then(value_to_string) {
                if !cweid.is_empty() && cweid != "-1" {
                    finding = finding.with_cwe(format!("CWE-{cweid}"));
                }
            }
            if let Some(uri) = alert.instances.first().and_then(|i| i.uri.clone()) {
                finding = finding.with_url(uri);
            }
            if let Some(solution) = &alert.solution {
                if !solution.is_empty() {
                    finding = finding.with_remediation(solution.clone());
                }
            }

            findings.push(finding);
        }
    }

    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    const SAMPLE_ZAP: &str = r#"{
        "site": [{
            "@name": "https://app.local",
            "alerts": [{
                "name": "SQL Injection",
                "riskcode": "3",
                "desc": "SQL injection may be possible.",
                "solution": "Use parameterized queries.",
                "cweid": "89",
                "instances": [{ "uri": "https://app.local/search", "method": "GET" }]
            }]
        }]
    }"#;

    #[test]
    fn test_parse_zap() {
        let findings = parse_zap(SAMPLE_ZAP).unwrap();
        assert_eq!(findings.len(), 1);

        let f = &findings[0];
        assert_eq!(f.category, Category::Dast);
        assert_eq!(f.severity, Severity::High);
        assert_eq!(f.cwe, Some("CWE-89".to_string()));
        assert_eq!(f.url, Some("https://app.local/search".to_string()));
        assert_eq!(f.file, None);
    }

    #[test]
    fn test_numeric_riskcode() {
        let report = r#"{"site": [{"alerts": [{"name": "CSP Missing", "riskcode": 1}]}]}"#;
        let findings = parse_zap(report).unwrap();
        assert_eq!(findings[0].severity, Severity::Low);
    }

    #[test]
    fn test_malformed_zap() {
        assert!(parse_zap(r#"{"alerts": []}"#).is_err());
    }
}
