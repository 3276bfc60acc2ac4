//! Report normalization: per-tool adapters for raw scanner output.
//!
//! Supports normalizing findings from:
//! - CodeQL (SARIF)
//! - Semgrep JSON output
//! - Bandit JSON output
//! - NodeJsScan JSON output
//! - npm audit JSON output
//! - Snyk JSON output
//! - OWASP ZAP JSON output
//!
//! Each tool gets its own adapter function with a fixed mapping from native
//! fields to canonical [`Finding`] fields. Dispatch is a registry lookup by
//! tool identifier; the merge pass never branches on tool names.

mod bandit;
mod merge;
mod nodejsscan;
mod npm_audit;
mod sarif;
mod semgrep;
mod snyk;
mod zap;

pub use bandit::parse_bandit;
pub use merge::{merge_findings, SEVERITY_TIER_TOLERANCE};
pub use nodejsscan::parse_nodejsscan;
pub use npm_audit::parse_npm_audit;
pub use sarif::parse_codeql_sarif;
pub use semgrep::parse_semgrep;
pub use snyk::parse_snyk;
pub use zap::parse_zap;

use std::path::Path;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::{Finding, Tool, VulnerabilityDataset};

/// Structural failure while normalizing one tool's report. The affected tool
/// is skipped; the run continues.
#[derive(Debug, thiserror::Error)]
#[error("malformed {} report: {}", .tool.as_str(), .reason)]
pub struct ReportError {
    pub tool: Tool,
    pub reason: String,
}

impl ReportError {
    pub fn new(tool: Tool, reason: impl Into<String>) -> Self {
        Self {
            tool,
            reason: reason.into(),
        }
    }
}

/// Adapter contract: raw report text in, canonical findings out.
pub type AdapterFn = fn(&str) -> Result<Vec<Finding>, ReportError>;

/// One registered tool: identifier, report file glob, adapter.
pub struct ToolAdapter {
    pub tool: Tool,
    pub file_pattern: &'static str,
    pub parse: AdapterFn,
}

/// The closed set of supported tools. Adding a tool is a new entry plus an
/// adapter module; merge logic stays untouched. Order here is tool-priority
/// order (static before dependency before dynamic scanners).
pub static ADAPTERS: &[ToolAdapter] = &[
    ToolAdapter {
        tool: Tool::CodeQl,
        file_pattern: "*codeql*.sarif",
        parse: parse_codeql_sarif,
    },
    ToolAdapter {
        tool: Tool::Semgrep,
        file_pattern: "*semgrep*.json",
        parse: parse_semgrep,
    },
    ToolAdapter {
        tool: Tool::Bandit,
        file_pattern: "*bandit*.json",
        parse: parse_bandit,
    },
    ToolAdapter {
        tool: Tool::NodeJsScan,
        file_pattern: "*nodejsscan*.json",
        parse: parse_nodejsscan,
    },
    ToolAdapter {
        tool: Tool::NpmAudit,
        file_pattern: "*npm_audit*.json",
        parse: parse_npm_audit,
    },
    ToolAdapter {
        tool: Tool::Snyk,
        file_pattern: "*snyk*.json",
        parse: parse_snyk,
    },
    ToolAdapter {
        tool: Tool::Zap,
        file_pattern: "*zap*.json",
        parse: parse_zap,
    },
];

/// Look up the adapter for a tool identifier.
pub fn adapter_for(tool: Tool) -> AdapterFn {
    ADAPTERS
        .iter()
        .find(|a| a.tool == tool)
        .map(|a| a.parse)
        .expect("every Tool variant is registered")
}

/// Result of normalizing a reports directory
#[derive(Debug)]
pub struct NormalizeOutcome {
    /// Merged, deduplicated findings
    pub dataset: VulnerabilityDataset,
    /// Tools whose report file was present and parsed
    pub tools_parsed: Vec<Tool>,
    /// Tools skipped because no report file was found
    pub tools_skipped: Vec<Tool>,
    /// Warnings collected during normalization
    pub warnings: Vec<String>,
}

impl NormalizeOutcome {
    pub fn summary(&self) -> String {
        format!(
            "Normalized {} findings from {} tools ({} skipped, {} warnings)",
            self.dataset.len(),
            self.tools_parsed.len(),
            self.tools_skipped.len(),
            self.warnings.len()
        )
    }
}

/// Normalize every report found in `dir`.
///
/// Scanning coverage is best-effort: an absent report file means the tool is
/// skipped, and a malformed one is recorded as a warning. Only a run that
/// produces zero findings across all tools is an error.
pub fn normalize_dir(dir: &Path) -> Result<NormalizeOutcome> {
    let mut raw: Vec<Finding> = Vec::new();
    let mut tools_parsed = Vec::new();
    let mut tools_skipped = Vec::new();
    let mut warnings = Vec::new();

    for adapter in ADAPTERS {
        let pattern = dir.join(adapter.file_pattern);
        let pattern = pattern.to_string_lossy();
        let mut found = false;

        for entry in glob::glob(&pattern)?.flatten() {
            found = true;
            let content = match std::fs::read_to_string(&entry) {
                Ok(c) => c,
                Err(e) => {
                    let msg = format!("unreadable {} report {}: {e}", adapter.tool.as_str(), entry.display());
                    tracing::warn!("{msg}");
                    warnings.push(msg);
                    continue;
                }
            };

            match (adapter.parse)(&content) {
                Ok(findings) => {
                    tracing::info!(
                        "parsed {} findings from {}",
                        findings.len(),
                        entry.display()
                    );
                    raw.extend(findings);
                }
                Err(e) => {
                    tracing::warn!("{e}");
                    warnings.push(e.to_string());
                }
            }
        }

        if found {
            tools_parsed.push(adapter.tool);
        } else {
            tracing::debug!("no {} report in {}", adapter.tool.as_str(), dir.display());
            tools_skipped.push(adapter.tool);
        }
    }

    if raw.is_empty() {
        bail!(
            "no usable findings in {} (all tool reports absent or malformed)",
            dir.display()
        );
    }

    let merged = merge_findings(raw);

    Ok(NormalizeOutcome {
        dataset: VulnerabilityDataset::new(merged),
        tools_parsed,
        tools_skipped,
        warnings,
    })
}

static CWE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)cwe-?(\d+)").expect("valid regex"));

/// Extract a CWE identifier from free text (rule ids, tags) if present.
/// Leading zeros are dropped so e.g. SARIF's "cwe-089" and ZAP's "89"
/// canonicalize to the same tag.
pub fn extract_cwe(text: &str) -> Option<String> {
    CWE_RE.captures(text).map(|caps| {
        let digits = caps[1].trim_start_matches('0');
        if digits.is_empty() {
            "CWE-0".to_string()
        } else {
            format!("CWE-{digits}")
        }
    })
}

/// Keyword table mapping vulnerability titles to OWASP Top 10 2021 categories.
static OWASP_KEYWORDS: &[(&str, &str)] = &[
    ("sql", "A03:2021 - Injection"),
    ("injection", "A03:2021 - Injection"),
    ("xss", "A03:2021 - Injection"),
    (
        "authentication",
        "A07:2021 - Identification and Authentication Failures",
    ),
    (
        "session",
        "A07:2021 - Identification and Authentication Failures",
    ),
    ("access", "A01:2021 - Broken Access Control"),
    ("authorization", "A01:2021 - Broken Access Control"),
    ("crypto", "A02:2021 - Cryptographic Failures"),
    ("sensitive", "A02:2021 - Cryptographic Failures"),
    ("xxe", "A05:2021 - Security Misconfiguration"),
    (
        "deserialization",
        "A08:2021 - Software and Data Integrity Failures",
    ),
    ("component", "A06:2021 - Vulnerable and Outdated Components"),
    (
        "logging",
        "A09:2021 - Security Logging and Monitoring Failures",
    ),
    ("ssrf", "A10:2021 - Server-Side Request Forgery"),
];

/// Map a vulnerability title/rule name to an OWASP Top 10 2021 category.
pub fn map_owasp(title: &str) -> String {
    let lower = title.to_lowercase();
    for (keyword, category) in OWASP_KEYWORDS {
        if lower.contains(keyword) {
            return (*category).to_string();
        }
    }
    "A04:2021 - Insecure Design".to_string()
}

/// Sanitize a rule ID into a finding title, e.g.
/// "javascript.express.security.audit.sqli.node-sqli" -> "Node Sqli"
pub fn rule_id_to_title(rule_id: &str) -> String {
    rule_id
        .split('.')
        .next_back()
        .unwrap_or(rule_id)
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            if word.chars().all(|c| c.is_uppercase()) {
                word.to_string()
            } else {
                let mut chars = word.chars();
                match chars.next() {
                    None => String::new(),
                    Some(f) => f.to_uppercase().collect::<String>() + chars.as_str(),
                }
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
