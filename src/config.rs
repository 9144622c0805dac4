//! Configuration module for semgate.
//!
//! Handles loading, validating, and providing default configuration values,
//! plus resolution of the target store location (per-call override, then
//! the `DB_PATH` environment variable, then the configured/default path).
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Environment variable naming the target SQLite store.
pub const DB_PATH_ENV: &str = "DB_PATH";

// ── Default value functions ──────────────────────────────────────────

fn default_db_path() -> String {
    "./db.sqlite".to_string()
}

fn default_row_limit() -> usize {
    1000
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

// ── Config structs ───────────────────────────────────────────────────

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Maximum number of rows returned by a guarded execution.
    #[serde(default = "default_row_limit")]
    pub row_limit: usize,

    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

// ── Default impls ────────────────────────────────────────────────────

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            row_limit: default_row_limit(),
            llm: LlmConfig::default(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
        }
    }
}

// ── Config implementation ────────────────────────────────────────────

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// If `config_path` is empty, defaults to `"config.json"`.
    /// If the file does not exist, returns a default config and optionally
    /// generates a template file.
    pub fn load(config_path: &str) -> Result<Self> {
        let path = if config_path.is_empty() {
            "config.json"
        } else {
            config_path
        };

        if !Path::new(path).exists() {
            info!("{path} not found, using defaults");
            let cfg = Self::default();

            // Generate template only for the default path
            if path == "config.json" {
                match cfg.save(path) {
                    Ok(()) => info!("Generated config template: {path}"),
                    Err(e) => warn!("Failed to generate config template: {e}"),
                }
            }

            return Ok(cfg);
        }

        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {path}"))?;

        let cfg: Config = match serde_json::from_str(&data) {
            Ok(c) => c,
            Err(e) => {
                warn!("Invalid JSON in {path}: {e}");
                warn!("Using default configuration");
                return Ok(Self::default());
            }
        };

        info!("Loaded configuration from {path}");
        Ok(cfg)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &str) -> Result<()> {
        let data = serde_json::to_string_pretty(self).context("failed to marshal config")?;
        std::fs::write(path, data).with_context(|| format!("failed to write config: {path}"))?;
        Ok(())
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.row_limit > 0, "row_limit must be positive");
        anyhow::ensure!(!self.llm.model.is_empty(), "llm.model must not be empty");
        anyhow::ensure!(
            !self.llm.base_url.is_empty(),
            "llm.base_url must not be empty"
        );
        Ok(())
    }

    /// Resolve the target store path.
    ///
    /// Priority order: explicit per-call override, then the `DB_PATH`
    /// environment variable, then the configured (or default) path.
    #[must_use]
    pub fn resolve_db_path(&self, override_path: Option<&str>) -> PathBuf {
        if let Some(p) = override_path {
            if !p.is_empty() {
                return PathBuf::from(p);
            }
        }

        if let Ok(p) = std::env::var(DB_PATH_ENV) {
            if !p.is_empty() {
                return PathBuf::from(p);
            }
        }

        PathBuf::from(&self.db_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let cfg = Config::default();
        assert_eq!(cfg.row_limit, 1000);
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
        cfg.validate().unwrap();
    }

    #[test]
    fn test_resolve_db_path_override_wins() {
        let cfg = Config::default();
        let p = cfg.resolve_db_path(Some("/tmp/override.sqlite"));
        assert_eq!(p, PathBuf::from("/tmp/override.sqlite"));
    }
}
