//! Curricula scanner: one run over the whole curricula root.
//!
//! `Start → Enumerate(root) → Dispatch(subdir)* → Complete`, or
//! `Start → Abort` when the configuration is unusable. Each dispatched
//! subdirectory is handled by a [`CurriculaWorker`] that parses and batches
//! its files strictly in listing order.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use lattes_common::{Curriculum, LattesError, Result};
use lattes_db::CurriculumStore;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use crate::concurrency::{SubdirReport, SubdirectoryHandler};
use crate::config::IngestConfig;
use crate::parser::parse_curriculum;
use crate::progress::{load_skip_set, ProgressLog};
use crate::repository::{BatchRepository, BatchStats};

/// Everything a run shares between its workers.
#[derive(Clone)]
pub struct RunContext {
    pub store: Arc<dyn CurriculumStore>,
    pub progress: Arc<ProgressLog>,
    pub config: IngestConfig,
    pub skip: Arc<HashSet<String>>,
}

// ── Result summary ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub subdirectories: usize,
    pub discovered: usize,
    pub skipped: usize,
    pub processed: usize,
    pub warnings: usize,
    pub failed: usize,
    pub batches_committed: usize,
    pub batches_rolled_back: usize,
    /// Fallback commits of single curricula after a rolled-back batch.
    pub individual_commits: usize,
    pub individual_failures: usize,
    /// Subdirectories whose handler stopped with a non-fatal error.
    pub worker_errors: usize,
    pub duration_ms: u64,
}

// ── Run orchestrator ──────────────────────────────────────────────────────────

/// Ingest every curriculum under `config.curricula_root`.
///
/// Only configuration problems (invalid values, missing root or
/// subdirectory, unusable log directory) are returned as errors; everything
/// else is contained and visible through the outcome logs.
#[instrument(skip(config, store), fields(root = %config.curricula_root.display()))]
pub async fn run(config: IngestConfig, store: Arc<dyn CurriculumStore>) -> Result<RunSummary> {
    let t0 = Instant::now();
    config.validate()?;

    let subdirs = enumerate(&config.curricula_root).await?;
    let progress = ProgressLog::open(&config.log_dir).await.map_err(|e| {
        LattesError::config(format!("log directory {}: {e}", config.log_dir.display()))
    })?;
    let skip = load_skip_set(&config.log_dir, config.resume_from_failed).await?;

    let strategy = config.strategy();
    info!(
        subdirectories = subdirs.len(),
        skip = skip.len(),
        strategy = strategy.name(),
        batch_size = config.batch_size,
        "Starting curricula ingestion"
    );

    let ctx = RunContext {
        store,
        progress: Arc::new(progress),
        config,
        skip: Arc::new(skip),
    };
    let worker = Arc::new(CurriculaWorker::new(ctx.clone()));

    let mut summary = RunSummary {
        subdirectories: subdirs.len(),
        ..Default::default()
    };
    let mut stats = BatchStats::default();

    for report in strategy.run(subdirs, worker).await {
        match report {
            Ok(report) => {
                summary.discovered += report.discovered;
                summary.skipped += report.skipped;
                stats.merge(&report.stats);
            }
            Err(e) if e.is_fatal() => {
                error!(error = %e, "Aborting curricula ingestion");
                return Err(e);
            }
            Err(e) => {
                summary.worker_errors += 1;
                error!(error = %e, "Subdirectory could not be processed");
            }
        }
    }

    let counts = ctx.progress.counts();
    summary.processed = counts.processed;
    summary.warnings = counts.warnings;
    summary.failed = counts.failed;
    summary.batches_committed = stats.batches_committed;
    summary.batches_rolled_back = stats.batches_rolled_back;
    summary.individual_commits = stats.individual_commits;
    summary.individual_failures = stats.individual_failures;
    summary.duration_ms = t0.elapsed().as_millis() as u64;

    info!(
        subdirectories = summary.subdirectories,
        discovered = summary.discovered,
        skipped = summary.skipped,
        processed = summary.processed,
        warnings = summary.warnings,
        failed = summary.failed,
        batches = summary.batches_committed,
        rolled_back = summary.batches_rolled_back,
        individual_commits = summary.individual_commits,
        duration_ms = summary.duration_ms,
        "Curricula ingestion complete"
    );

    Ok(summary)
}

/// Subdirectories of `root`, sorted by name. Symbolic links are followed.
pub async fn enumerate(root: &Path) -> Result<Vec<PathBuf>> {
    let metadata = tokio::fs::metadata(root)
        .await
        .map_err(|e| LattesError::config(format!("curricula root {}: {e}", root.display())))?;
    if !metadata.is_dir() {
        return Err(LattesError::config(format!(
            "curricula root {} is not a directory",
            root.display()
        )));
    }

    let mut entries = tokio::fs::read_dir(root).await?;
    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => dirs.push(path),
            Ok(_) => debug!(path = %path.display(), "Ignoring non-directory entry in root"),
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable entry in root"),
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// `*.xml` files directly inside `dir`, in listing order. Symbolic links
/// to files count as files.
pub async fn list_curricula(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| LattesError::config(format!("subdirectory {}: {e}", dir.display())))?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_xml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"));
        if !is_xml {
            continue;
        }
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "Ignoring unreadable curriculum entry"),
        }
    }
    Ok(files)
}

/// Researcher id encoded in a curriculum file name.
pub fn researcher_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// Parses and stores the curricula of one subdirectory at a time.
pub struct CurriculaWorker {
    ctx: RunContext,
}

impl CurriculaWorker {
    pub fn new(ctx: RunContext) -> Self {
        Self { ctx }
    }

    async fn load(&self, path: &Path, id: &str) -> Result<Curriculum> {
        let bytes = tokio::fs::read(path).await?;
        let id = id.to_string();
        tokio::task::spawn_blocking(move || parse_curriculum(&id, bytes.as_slice()))
            .await
            .map_err(|e| LattesError::Other(e.into()))?
    }
}

#[async_trait]
impl SubdirectoryHandler for CurriculaWorker {
    #[instrument(skip(self, dir), fields(dir = %dir.display()))]
    async fn handle(&self, dir: PathBuf) -> Result<SubdirReport> {
        let files = list_curricula(&dir).await?;
        let mut repo = BatchRepository::new(
            self.ctx.store.clone(),
            self.ctx.progress.clone(),
            self.ctx.config.batch_size,
            self.ctx.config.dedup_scope,
        );
        let mut report = SubdirReport {
            discovered: files.len(),
            ..Default::default()
        };

        for path in files {
            let Some(id) = researcher_id(&path) else {
                warn!(path = %path.display(), "File name is not a researcher id");
                report.skipped += 1;
                continue;
            };
            if self.ctx.skip.contains(&id) {
                report.skipped += 1;
                continue;
            }

            match self.load(&path, &id).await {
                Ok(curriculum) => repo.push(curriculum).await,
                Err(e) => {
                    report.parse_failures += 1;
                    warn!(researcher_id = %id, error = %e, "Curriculum could not be read");
                    self.ctx.progress.failed(&id, &e).await;
                }
            }
        }
        repo.flush().await;

        report.stats = repo.stats();
        debug!(
            discovered = report.discovered,
            skipped = report.skipped,
            "Subdirectory done"
        );
        report.dir = dir;
        Ok(report)
    }
}
