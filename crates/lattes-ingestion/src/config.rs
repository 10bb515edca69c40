//! Run configuration for one ingestion pass.

use std::path::PathBuf;

use lattes_common::{LattesError, Result};
use lattes_db::DedupScope;
use serde::{Deserialize, Serialize};

use crate::concurrency::{ConcurrencyStrategy, Pool, Serial};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    Serial,
    #[default]
    Pool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Directory holding `<2-digit-subdir>/<lattes-id>.xml`.
    #[serde(default = "default_curricula_root")]
    pub curricula_root: PathBuf,
    /// Where processed/warning/failed logs are appended.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default)]
    pub dedup_scope: DedupScope,
    /// Skip ids already in the failed log instead of retrying them.
    #[serde(default)]
    pub resume_from_failed: bool,
}

fn default_curricula_root() -> PathBuf { PathBuf::from("./curricula") }
fn default_log_dir()        -> PathBuf { PathBuf::from("./logs") }
fn default_batch_size()     -> usize   { 50 }
fn default_workers()        -> usize   { 8 }

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            curricula_root: default_curricula_root(),
            log_dir: default_log_dir(),
            batch_size: default_batch_size(),
            strategy: StrategyKind::default(),
            workers: default_workers(),
            dedup_scope: DedupScope::default(),
            resume_from_failed: false,
        }
    }
}

impl IngestConfig {
    /// Reject values that would make the run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LattesError::config("batch_size must be at least 1"));
        }
        if self.workers == 0 {
            return Err(LattesError::config("workers must be at least 1"));
        }
        Ok(())
    }

    pub fn strategy(&self) -> Box<dyn ConcurrencyStrategy> {
        match self.strategy {
            StrategyKind::Serial => Box::new(Serial),
            StrategyKind::Pool => Box::new(Pool::new(self.workers)),
        }
    }
}
