//! Configuration for the `bdd` binary.
//! The default file lives at ~/.bdd/config/bdd.toml; `--config` overrides it.

use anyhow::{anyhow, Context, Result};
use bdd_algo::Chi2Options;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BddConfig {
    /// Defaults for the Chi-squared test
    #[serde(default)]
    pub bad_data: Chi2Options,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    pub fn level(&self) -> Result<tracing::Level> {
        self.level
            .parse()
            .map_err(|_| anyhow!("invalid log level '{}' in [logging]", self.level))
    }
}

/// Root of the per-user bdd directory (~/.bdd)
pub fn bdd_home() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| anyhow!("Cannot determine home directory"))
        .map(|h| h.join(".bdd"))
}

/// Location: ~/.bdd/config/bdd.toml
pub fn default_config_path() -> Result<PathBuf> {
    Ok(bdd_home()?.join("config").join("bdd.toml"))
}

/// Load an explicit config file, or the default one when it exists.
///
/// A missing explicit file is an error; a missing default file yields
/// [`BddConfig::default`].
pub fn load_config(explicit: Option<&Path>) -> Result<BddConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match default_config_path() {
            Ok(path) if path.exists() => path,
            _ => return Ok(BddConfig::default()),
        },
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("parsing config {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<BddConfig> {
    let config: BddConfig = toml::from_str(contents)?;
    config.bad_data.validate()?;
    Ok(config)
}
