//! Policy records and per-model collections.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Marker used as the model name of the reference collection
pub const REFERENCE_MODEL: &str = "reference";

/// One generated-or-reference policy. `extra` carries control_name and any
/// other metadata fields through unmodified.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<String>,
    #[serde(default)]
    pub policy: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PolicyRecord {
    /// Control identifier normalized for matching: trimmed, lowercased.
    /// None when absent or blank.
    pub fn match_key(&self) -> Option<String> {
        self.control_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Ordered set of policies for one model. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct PolicyCollection {
    pub model: String,
    pub policies: Vec<PolicyRecord>,
}

/// Policy files are either `{"policies": [...]}` or a bare array
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PolicyFile {
    Wrapped { policies: Vec<PolicyRecord> },
    Bare(Vec<PolicyRecord>),
}

impl PolicyCollection {
    pub fn new(model: impl Into<String>, policies: Vec<PolicyRecord>) -> Self {
        Self {
            model: model.into(),
            policies,
        }
    }

    pub fn load(path: &Path, model: impl Into<String>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file {}", path.display()))?;
        Self::from_json(&content, model)
            .with_context(|| format!("failed to parse policy file {}", path.display()))
    }

    pub fn from_json(content: &str, model: impl Into<String>) -> Result<Self> {
        let file: PolicyFile =
            serde_json::from_str(content).context("expected a policies array")?;
        let policies = match file {
            PolicyFile::Wrapped { policies } => policies,
            PolicyFile::Bare(policies) => policies,
        };
        Ok(Self::new(model, policies))
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
