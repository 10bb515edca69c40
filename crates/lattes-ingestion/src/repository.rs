//! Batch buffer in front of the curriculum store.
//!
//! Handles:
//! - Grouping parsed curricula into batches of a fixed size
//! - One all-or-nothing transaction per batch
//! - Member-by-member fallback after a rolled-back batch
//! - Outcome events for every curriculum

use std::sync::Arc;

use lattes_common::Curriculum;
use lattes_db::{BatchRows, CurriculumStore, DedupScope};
use serde::Serialize;
use tracing::{debug, warn};

use crate::progress::ProgressLog;

/// Per-repository flush counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub batches_committed: usize,
    pub batches_rolled_back: usize,
    pub individual_commits: usize,
    pub individual_failures: usize,
}

impl BatchStats {
    pub fn merge(&mut self, other: &BatchStats) {
        self.batches_committed += other.batches_committed;
        self.batches_rolled_back += other.batches_rolled_back;
        self.individual_commits += other.individual_commits;
        self.individual_failures += other.individual_failures;
    }
}

/// Buffers curricula for one worker and flushes them in batches.
///
/// Not shared between workers: each worker owns its repository, and each
/// flush acquires its own storage session through the store.
pub struct BatchRepository {
    store: Arc<dyn CurriculumStore>,
    progress: Arc<ProgressLog>,
    batch_size: usize,
    scope: DedupScope,
    pending: Vec<Curriculum>,
    stats: BatchStats,
}

impl BatchRepository {
    pub fn new(
        store: Arc<dyn CurriculumStore>,
        progress: Arc<ProgressLog>,
        batch_size: usize,
        scope: DedupScope,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            store,
            progress,
            batch_size,
            scope,
            pending: Vec::with_capacity(batch_size),
            stats: BatchStats::default(),
        }
    }

    /// Queue one curriculum; flushes when the batch is full.
    pub async fn push(&mut self, curriculum: Curriculum) {
        self.pending.push(curriculum);
        if self.pending.len() >= self.batch_size {
            self.flush().await;
        }
    }

    /// Persist everything queued so far.
    pub async fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        let rows = BatchRows::collect(&batch, self.scope);

        match self.store.commit(&rows).await {
            Ok(()) => {
                self.stats.batches_committed += 1;
                debug!(size = batch.len(), rows = rows.row_count(), "Batch flushed");
                for curriculum in &batch {
                    self.progress.processed(curriculum.id()).await;
                }
            }
            Err(e) => {
                self.stats.batches_rolled_back += 1;
                warn!(
                    size = batch.len(),
                    first = batch.first().map(Curriculum::id).unwrap_or_default(),
                    error = %e,
                    "Batch rolled back, retrying members individually"
                );
                let reason = format!("batch rolled back: {e}");
                for curriculum in &batch {
                    self.progress.warning(curriculum.id(), &reason).await;
                }
                for curriculum in &batch {
                    self.persist_one(curriculum).await;
                }
            }
        }
    }

    async fn persist_one(&mut self, curriculum: &Curriculum) {
        let rows = BatchRows::collect(std::slice::from_ref(curriculum), self.scope);
        match self.store.commit(&rows).await {
            Ok(()) => {
                self.stats.individual_commits += 1;
                self.progress.processed(curriculum.id()).await;
            }
            Err(e) => {
                self.stats.individual_failures += 1;
                warn!(researcher_id = %curriculum.id(), error = %e, "Curriculum could not be stored");
                self.progress.failed(curriculum.id(), &e).await;
            }
        }
    }

    /// Number of curricula waiting for the next flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn stats(&self) -> BatchStats {
        self.stats
    }
}
