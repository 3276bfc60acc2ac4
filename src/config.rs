//! Configuration loading for `.vulneval/config.toml`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::score::JudgeConfig;

pub const CONFIG_DIR: &str = ".vulneval";
pub const CONFIG_FILE: &str = "config.toml";

/// Evaluation tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluateConfig {
    /// Recall weighting for the sequence-similarity F-measure
    pub beta: f64,
}

impl Default for EvaluateConfig {
    fn default() -> Self {
        Self {
            beta: crate::score::DEFAULT_LCS_BETA,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub judge: JudgeConfig,
    pub evaluate: EvaluateConfig,
}

impl Config {
    pub fn config_path(work_dir: &Path) -> PathBuf {
        work_dir.join(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load the config from the work dir, falling back to defaults when no
    /// config file exists.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let path = Self::config_path(work_dir);
        if !path.exists() {
            tracing::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Resolve the judge API key: the env var named in config, then
    /// `~/.vulneval/api_key`.
    pub fn api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(&self.judge.api_key_env) {
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Some(key);
            }
        }

        let path = dirs::home_dir()?.join(CONFIG_DIR).join("api_key");
        let key = std::fs::read_to_string(path).ok()?;
        let key = key.trim().to_string();
        (!key.is_empty()).then_some(key)
    }

    /// Write a default config file. Fails if one exists unless `force`.
    pub fn init(work_dir: &Path, force: bool) -> Result<PathBuf> {
        let path = Self::config_path(work_dir);
        if path.exists() && !force {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(&Self::default())
            .context("failed to serialize default config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.evaluate.beta, crate::score::DEFAULT_LCS_BETA);
        assert_eq!(config.judge.max_retries, 3);
    }

    #[test]
    fn test_init_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = Config::init(dir.path(), false).unwrap();
        assert!(path.exists());

        // Refuses to clobber without force
        assert!(Config::init(dir.path(), false).is_err());
        assert!(Config::init(dir.path(), true).is_ok());

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.judge.concurrency, 4);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(
            config_dir.join(CONFIG_FILE),
            "[evaluate]\nbeta = 2.0\n",
        )
        .unwrap();

        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.evaluate.beta, 2.0);
        assert_eq!(config.judge.max_retries, 3);
    }
}
