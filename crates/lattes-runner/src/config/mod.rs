//! Configuration loading for the lattes runner.
//! Reads lattes.toml from the current directory or path in LATTES_CONFIG env var.

use anyhow::Context;
use lattes_ingestion::IngestConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub ingestion: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "bool_true")]
    pub create_if_missing: bool,
}

fn default_url()             -> String { "sqlite://lattes.db".to_string() }
fn default_max_connections() -> u32    { 10 }
fn bool_true()               -> bool   { true }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_connections: default_max_connections(),
            create_if_missing: true,
        }
    }
}

mod tests;

impl Config {
    /// Load configuration from lattes.toml.
    /// Checks LATTES_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("LATTES_CONFIG")
            .unwrap_or_else(|_| "lattes.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Set LATTES_CONFIG or create lattes.toml with an [ingestion] section.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing {}", path.display()))?;
        config.ingestion.validate()?;
        if config.database.max_connections == 0 {
            anyhow::bail!("database.max_connections must be at least 1");
        }
        Ok(config)
    }
}
