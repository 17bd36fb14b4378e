//! TOML settings. Every field has a default, so an empty file is valid.
//!
//! ```toml
//! [store]
//! url = "http://loki:3100"
//! timeout_secs = 30
//!
//! [analysis]
//! default_window = "last 15 minutes"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "LOGMEDIC_CONFIG";
pub const LOCAL_CONFIG: &str = "logmedic.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let settings: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(settings)
    }

    /// `$LOGMEDIC_CONFIG`, then `./logmedic.toml`, then defaults.
    ///
    /// Files that exist but cannot be used are skipped; the reasons come back
    /// alongside the settings so the caller can report them once logging is up.
    pub fn load_or_default() -> (Self, Vec<String>) {
        let mut skipped = Vec::new();
        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(s) => return (s, skipped),
                Err(e) => skipped.push(format!("{} is unusable, trying fallback: {:#}", CONFIG_ENV, e)),
            }
        }

        let local = Path::new(LOCAL_CONFIG);
        if local.exists() {
            match Self::load(local) {
                Ok(s) => return (s, skipped),
                Err(e) => skipped.push(format!("local config is unusable: {:#}", e)),
            }
        }

        debug!("no config file found, using defaults");
        (Self::default(), skipped)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub url: String,
    pub timeout_secs: u64,
    pub limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "http://loki:3100".to_string(),
            timeout_secs: 30,
            limit: crate::query::DEFAULT_LIMIT,
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sources kept by the decomposed `analyze` stage.
    pub top_sources: usize,
    /// Sources shown in the combined report.
    pub report_sources: usize,
    /// Pattern rows shown in the combined report.
    pub report_patterns: usize,
    /// Phrase used when a routed query names no time range.
    pub default_window: String,
    /// Related documents attached to a report.
    pub knowledge_hits: usize,
    /// Bound on one knowledge-base lookup.
    pub knowledge_timeout_secs: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_sources: crate::sources::DEFAULT_TOP_SOURCES,
            report_sources: 3,
            report_patterns: 5,
            default_window: "last 1 hour".to_string(),
            knowledge_hits: 3,
            knowledge_timeout_secs: 10,
        }
    }
}

impl AnalysisConfig {
    pub fn knowledge_timeout(&self) -> Duration {
        Duration::from_secs(self.knowledge_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}
