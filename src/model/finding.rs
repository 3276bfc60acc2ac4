//! Finding model - one normalized vulnerability observation

use serde::{Deserialize, Serialize};

/// Severity levels for findings, ordered Critical > High > Medium > Low > Info
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "critical" | "crit" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" | "med" | "moderate" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "informational" => Some(Severity::Info),
            _ => None,
        }
    }

    /// Numeric tier, higher is more severe
    pub fn tier(&self) -> u8 {
        match self {
            Severity::Critical => 5,
            Severity::High => 4,
            Severity::Medium => 3,
            Severity::Low => 2,
            Severity::Info => 1,
        }
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.tier().cmp(&other.tier())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Finding category by analysis technique
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category {
    Sast,
    Sca,
    Dast,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Sast => "SAST",
            Category::Sca => "SCA",
            Category::Dast => "DAST",
        }
    }
}

/// Scanning tools we know how to normalize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tool {
    CodeQl,
    Semgrep,
    Bandit,
    NodeJsScan,
    NpmAudit,
    Snyk,
    Zap,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::CodeQl => "codeql",
            Tool::Semgrep => "semgrep",
            Tool::Bandit => "bandit",
            Tool::NodeJsScan => "nodejsscan",
            Tool::NpmAudit => "npm_audit",
            Tool::Snyk => "snyk",
            Tool::Zap => "zap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "codeql" => Some(Tool::CodeQl),
            "semgrep" => Some(Tool::Semgrep),
            "bandit" => Some(Tool::Bandit),
            "nodejsscan" | "njsscan" => Some(Tool::NodeJsScan),
            "npm_audit" | "npm-audit" | "npm audit" => Some(Tool::NpmAudit),
            "snyk" => Some(Tool::Snyk),
            "zap" | "owasp zap" => Some(Tool::Zap),
            _ => None,
        }
    }

    pub fn category(&self) -> Category {
        match self {
            Tool::CodeQl | Tool::Semgrep | Tool::Bandit | Tool::NodeJsScan => Category::Sast,
            Tool::NpmAudit | Tool::Snyk => Category::Sca,
            Tool::Zap => Category::Dast,
        }
    }

    /// Merge priority: static analyzers carry the most precise location and
    /// classification data, dependency scanners next, dynamic scanners last.
    pub fn priority(&self) -> u8 {
        match self.category() {
            Category::Sast => 0,
            Category::Sca => 1,
            Category::Dast => 2,
        }
    }
}

/// One normalized vulnerability observation.
///
/// Constructed only by report adapters; treated as immutable afterward.
/// `tools` starts with the reporting tool and grows during merge when
/// multiple tools observe the same issue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Tools that reported this finding, in arrival order
    pub tools: Vec<Tool>,
    /// SAST / SCA / DAST
    pub category: Category,
    /// Short title
    pub title: String,
    /// Always present after normalization; unmapped natives default to Medium
    pub severity: Severity,
    /// CWE ID if known, e.g. "CWE-89"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwe: Option<String>,
    /// OWASP Top 10 2021 category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owasp: Option<String>,
    /// Source file path (SAST)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Line number in `file`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    /// Target URL (DAST)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Affected package name (SCA)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    /// Affected version range (SCA)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Suggested remediation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    /// Free-form description
    pub description: String,
}

impl Finding {
    /// Create a new finding with minimal required fields
    pub fn new(tool: Tool, title: impl Into<String>) -> Self {
        Self {
            tools: vec![tool],
            category: tool.category(),
            title: title.into(),
            severity: Severity::Medium,
            cwe: None,
            owasp: None,
            file: None,
            line: None,
            url: None,
            package: None,
            version: None,
            remediation: None,
            description: String::new(),
        }
    }

    // Builder methods
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_cwe(mut self, cwe: impl Into<String>) -> Self {
        self.cwe = Some(cwe.into());
        self
    }

    pub fn with_owasp(mut self, owasp: impl Into<String>) -> Self {
        self.owasp = Some(owasp.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = Some(package.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Title normalized for duplicate detection: lowercased, whitespace
    /// collapsed to single spaces.
    pub fn normalized_title(&self) -> String {
        self.title
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    /// Location key for duplicate detection: file path when present,
    /// otherwise target URL, otherwise empty.
    pub fn location_key(&self) -> &str {
        self.file
            .as_deref()
            .or(self.url.as_deref())
            .unwrap_or("")
            .trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Low > Severity::Info);
        assert_eq!(Severity::High.max(Severity::Low), Severity::High);
    }

    #[test]
    fn test_severity_parsing() {
        assert_eq!(Severity::from_str("HIGH"), Some(Severity::High));
        assert_eq!(Severity::from_str("moderate"), Some(Severity::Medium));
        assert_eq!(Severity::from_str("informational"), Some(Severity::Info));
        assert_eq!(Severity::from_str("bogus"), None);
    }

    #[test]
    fn test_tool_category() {
        assert_eq!(Tool::Semgrep.category(), Category::Sast);
        assert_eq!(Tool::NpmAudit.category(), Category::Sca);
        assert_eq!(Tool::Zap.category(), Category::Dast);
        assert!(Tool::CodeQl.priority() < Tool::Snyk.priority());
        assert!(Tool::Snyk.priority() < Tool::Zap.priority());
    }

    #[test]
    fn test_finding_builder() {
        let finding = Finding::new(Tool::Semgrep, "SQL Injection")
            .with_severity(Severity::High)
            .with_cwe("CWE-89")
            .with_file("src/db.js")
            .with_line(45);

        assert_eq!(finding.tools, vec![Tool::Semgrep]);
        assert_eq!(finding.category, Category::Sast);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.location_key(), "src/db.js");
    }

    #[test]
    fn test_normalized_title() {
        let finding = Finding::new(Tool::Zap, "  SQL\t Injection  ");
        assert_eq!(finding.normalized_title(), "sql injection");
    }

    #[test]
    fn test_location_key_falls_back_to_url() {
        let finding = Finding::new(Tool::Zap, "XSS").with_url("https://app.local/search");
        assert_eq!(finding.location_key(), "https://app.local/search");
        assert_eq!(Finding::new(Tool::Snyk, "lodash").location_key(), "");
    }
}
