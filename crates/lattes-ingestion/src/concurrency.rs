//! Subdirectory dispatch strategies.
//!
//! A strategy visits every subdirectory it is given and invokes the handler
//! once per subdirectory. `Serial` runs them one after another in the given
//! order; `Pool` runs at most `workers` handlers at a time with no ordering
//! between subdirectories. A fatal handler error stops both: no further
//! subdirectory is started and in-flight pool tasks are cancelled.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lattes_common::{LattesError, Result};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

use crate::repository::BatchStats;

/// What one handler invocation did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubdirReport {
    pub dir: PathBuf,
    pub discovered: usize,
    pub skipped: usize,
    pub parse_failures: usize,
    pub stats: BatchStats,
}

/// Work performed for one subdirectory.
#[async_trait]
pub trait SubdirectoryHandler: Send + Sync + 'static {
    async fn handle(&self, dir: PathBuf) -> Result<SubdirReport>;
}

/// How subdirectories are scheduled.
#[async_trait]
pub trait ConcurrencyStrategy: Send + Sync {
    /// Run `handler` once for each of `dirs`. Reports come back in
    /// completion order; after a fatal error the last report is that error.
    async fn run(
        &self,
        dirs: Vec<PathBuf>,
        handler: Arc<dyn SubdirectoryHandler>,
    ) -> Vec<Result<SubdirReport>>;

    fn name(&self) -> &'static str;
}

/// Sequential, deterministic.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

#[async_trait]
impl ConcurrencyStrategy for Serial {
    async fn run(
        &self,
        dirs: Vec<PathBuf>,
        handler: Arc<dyn SubdirectoryHandler>,
    ) -> Vec<Result<SubdirReport>> {
        let mut reports = Vec::with_capacity(dirs.len());
        for dir in dirs {
            let report = handler.handle(dir).await;
            let fatal = matches!(&report, Err(e) if e.is_fatal());
            reports.push(report);
            if fatal {
                break;
            }
        }
        reports
    }

    fn name(&self) -> &'static str {
        "serial"
    }
}

/// Fixed-size worker pool, one task per subdirectory.
#[derive(Debug, Clone, Copy)]
pub struct Pool {
    workers: usize,
}

impl Pool {
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1) }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

#[async_trait]
impl ConcurrencyStrategy for Pool {
    async fn run(
        &self,
        dirs: Vec<PathBuf>,
        handler: Arc<dyn SubdirectoryHandler>,
    ) -> Vec<Result<SubdirReport>> {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks = JoinSet::new();

        for dir in dirs {
            let semaphore = Arc::clone(&semaphore);
            let handler = Arc::clone(&handler);
            tasks.spawn(async move {
                // Held until the subdirectory is finished.
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| LattesError::Other(e.into()))?;
                debug!(dir = %dir.display(), "Worker picked up subdirectory");
                handler.handle(dir).await
            });
        }

        let mut reports = Vec::with_capacity(tasks.len());
        let mut fatal: Option<LattesError> = None;
        while let Some(joined) = tasks.join_next().await {
            let report = match joined {
                Ok(report) => report,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => Err(LattesError::Other(anyhow::anyhow!("worker task failed: {e}"))),
            };
            match report {
                Err(e) if e.is_fatal() => {
                    if fatal.is_none() {
                        tasks.abort_all();
                        fatal = Some(e);
                    }
                }
                report => reports.push(report),
            }
        }
        if let Some(e) = fatal {
            reports.push(Err(e));
        }
        reports
    }

    fn name(&self) -> &'static str {
        "pool"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<PathBuf>>,
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl SubdirectoryHandler for Recorder {
        async fn handle(&self, dir: PathBuf) -> Result<SubdirReport> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);

            if dir.ends_with("bad") {
                return Err(LattesError::Storage("unreadable".into()));
            }
            if dir.ends_with("gone") {
                return Err(LattesError::config("subdirectory vanished"));
            }
            self.seen.lock().unwrap().push(dir.clone());
            Ok(SubdirReport { dir, discovered: 1, ..Default::default() })
        }
    }

    fn dirs(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("{i:02}"))).collect()
    }

    #[tokio::test]
    async fn test_serial_keeps_order() {
        let recorder = Arc::new(Recorder::default());
        let reports = Serial.run(dirs(5), recorder.clone()).await;
        assert_eq!(reports.len(), 5);
        assert_eq!(*recorder.seen.lock().unwrap(), dirs(5));
        assert_eq!(recorder.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_pool_visits_every_dir_within_bound() {
        let recorder = Arc::new(Recorder::default());
        let reports = Pool::new(3).run(dirs(12), recorder.clone()).await;
        assert_eq!(reports.len(), 12);
        assert!(reports.iter().all(|r| r.is_ok()));

        let mut seen = recorder.seen.lock().unwrap().clone();
        seen.sort();
        assert_eq!(seen, dirs(12));
        let peak = recorder.peak.load(Ordering::SeqCst);
        assert!(peak <= 3, "at most 3 handlers at once, saw {peak}");
    }

    #[tokio::test]
    async fn test_handler_errors_are_reported_not_dropped() {
        let recorder = Arc::new(Recorder::default());
        let mut input = dirs(2);
        input.push(PathBuf::from("bad"));
        let reports = Pool::new(2).run(input, recorder).await;
        assert_eq!(reports.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[tokio::test]
    async fn test_serial_stops_at_fatal_error() {
        let recorder = Arc::new(Recorder::default());
        let input = vec![PathBuf::from("00"), PathBuf::from("gone"), PathBuf::from("02")];
        let reports = Serial.run(input, recorder.clone()).await;
        assert_eq!(reports.len(), 2);
        assert!(reports[1].as_ref().is_err_and(|e| e.is_fatal()));
        assert_eq!(*recorder.seen.lock().unwrap(), vec![PathBuf::from("00")]);
    }

    #[tokio::test]
    async fn test_pool_ends_with_fatal_error() {
        let recorder = Arc::new(Recorder::default());
        let mut input = vec![PathBuf::from("gone")];
        input.extend(dirs(20));
        let reports = Pool::new(1).run(input, recorder.clone()).await;
        assert!(reports.last().is_some_and(|r| r.as_ref().is_err_and(|e| e.is_fatal())));
        assert_eq!(reports.iter().filter(|r| r.is_err()).count(), 1);
        assert!(recorder.seen.lock().unwrap().len() < 20, "remaining subdirectories are cancelled");
    }

    #[test]
    fn test_zero_workers_is_clamped() {
        assert_eq!(Pool::new(0).workers(), 1);
    }
}
