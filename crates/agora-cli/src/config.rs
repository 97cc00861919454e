//! Driver configuration.
//!
//! Handles loading and validation of the driver configuration from a TOML
//! file and command-line arguments.

use std::path::{Path, PathBuf};
use agora_governance::DaoConfig;
use serde::{Deserialize, Serialize};

/// Driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Network preset used when no explicit DAO parameters are given
    pub network: String,
    /// Explicit DAO parameters; override the network preset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dao: Option<DaoConfig>,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            network: "hardhat".to_string(),
            dao: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        check_path(path)?;

        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e))?;
        let config: CliConfig = toml::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e))?;
        Ok(config)
    }

    /// Save configuration to file.
    pub fn to_file(&self, path: &Path) -> anyhow::Result<()> {
        check_path(path)?;

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .map_err(|e| anyhow::anyhow!("Failed to write config file '{}': {}", path.display(), e))?;
        Ok(())
    }

    /// DAO parameters in effect: the explicit table, else the network preset.
    pub fn resolve_dao(&self) -> anyhow::Result<DaoConfig> {
        let dao = match &self.dao {
            Some(dao) => dao.clone(),
            None => DaoConfig::for_network(&self.network)?,
        };
        dao.validate()?;
        Ok(dao)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.network.is_empty() {
            anyhow::bail!("Network name cannot be empty");
        }

        match self.logging.format.as_str() {
            "json" | "pretty" => {}
            other => anyhow::bail!("Unknown log format '{}' (expected json or pretty)", other),
        }

        self.resolve_dao()?;
        Ok(())
    }
}

/// Reject paths that climb out of the working tree.
fn check_path(path: &Path) -> anyhow::Result<()> {
    if path.to_string_lossy().contains("..") {
        anyhow::bail!("Invalid path: directory traversal detected");
    }
    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or filter directives
    pub level: String,
    /// Log to file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Log format (json|pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            log_file: None,
            format: "pretty".to_string(),
        }
    }
}
