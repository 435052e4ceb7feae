use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{FlawFinderError, Result};

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "FLAWFINDER_CONFIG";

/// Config file picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_PATH: &str = ".flawfinder/config.toml";

/// Top-level configuration loaded from `.flawfinder/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlawFinderConfig {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerMode {
    #[default]
    Mock,
    External,
}

/// Which analyzer to run and, for the external one, how to invoke it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    #[serde(default)]
    pub mode: AnalyzerMode,
    /// Program that reads a workflow on stdin and prints an analysis on stdout.
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            mode: AnalyzerMode::Mock,
            command: None,
            args: Vec::new(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".flawfinder/store.json")
}

impl FlawFinderConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FlawFinderError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::parse(&content).map_err(|e| match e {
            FlawFinderError::Config(message) => {
                FlawFinderError::Config(format!("{} ({})", message, path.display()))
            }
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: FlawFinderConfig = toml::from_str(content)
            .map_err(|e| FlawFinderError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration: explicit path, then `FLAWFINDER_CONFIG`, then
    /// the default file if present, then built-in defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(path) = std::env::var(CONFIG_ENV).ok().filter(|p| !p.trim().is_empty()) {
            return Self::load(Path::new(&path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.is_file() {
            return Self::load(default_path);
        }

        Ok(Self::default())
    }

    fn validate(&self) -> Result<()> {
        if self.analyzer.mode == AnalyzerMode::External
            && self
                .analyzer
                .command
                .as_deref()
                .map_or(true, |c| c.trim().is_empty())
        {
            return Err(FlawFinderError::Config(
                "analyzer.mode = \"external\" requires analyzer.command".to_string(),
            ));
        }
        Ok(())
    }
}
