//! Configuration for the bitclass CLI

use anyhow::{Context, Result};
use bitclass_core::ClassifierConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "bitclass.toml";

/// CLI configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Classifier layout and reduction
    pub classifier: ClassifierConfig,
    /// Benchmark defaults
    pub bench: BenchConfig,
}

/// Benchmark defaults, overridable per invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of random keys to classify
    pub keys: usize,
    /// RNG seed; a fresh one is drawn when unset
    pub seed: Option<u64>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            keys: 1_000_000,
            seed: None,
        }
    }
}

impl Config {
    /// Load from an explicit path, else `./bitclass.toml` if present, else defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(&path),
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.exists() {
                    Self::from_file(local)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse and validate a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.classifier.validate()?;
        if self.classifier.num_fields != 4 {
            anyhow::bail!(
                "IPv4 rule files need classifier.num_fields = 4, got {}",
                self.classifier.num_fields
            );
        }
        if self.bench.keys == 0 {
            anyhow::bail!("bench.keys must be greater than 0");
        }
        Ok(())
    }
}
