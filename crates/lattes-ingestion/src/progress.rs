//! Append-only outcome logs and the resume skip-set.
//!
//! Three files live in the log directory, one line per event:
//!
//! | file            | line format          |
//! |-----------------|----------------------|
//! | `processed.log` | `<id>`               |
//! | `warning.log`   | `<id>\t<reason>`     |
//! | `failed.log`    | `<id>\t<reason>`     |
//!
//! Readers take the first tab-separated field of each line, skip blank
//! lines and tolerate a truncated final line.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::error;

/// Outcome category of one curriculum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Processed,
    Warning,
    Failed,
}

impl Outcome {
    pub fn file_name(self) -> &'static str {
        match self {
            Outcome::Processed => "processed.log",
            Outcome::Warning => "warning.log",
            Outcome::Failed => "failed.log",
        }
    }
}

/// One line in one of the outcome logs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    pub outcome: Outcome,
    pub researcher_id: String,
    pub reason: Option<String>,
}

impl OutcomeEvent {
    pub fn processed(researcher_id: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Processed,
            researcher_id: researcher_id.into(),
            reason: None,
        }
    }

    pub fn warning(researcher_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            outcome: Outcome::Warning,
            researcher_id: researcher_id.into(),
            reason: Some(reason.to_string()),
        }
    }

    pub fn failed(researcher_id: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self {
            outcome: Outcome::Failed,
            researcher_id: researcher_id.into(),
            reason: Some(reason.to_string()),
        }
    }

    /// Render as one log line, newline included.
    pub fn to_line(&self) -> String {
        match &self.reason {
            Some(reason) if self.outcome != Outcome::Processed => {
                format!("{}\t{}\n", self.researcher_id, sanitize(reason))
            }
            _ => format!("{}\n", self.researcher_id),
        }
    }
}

// Reasons must stay on one line and must not introduce extra fields.
fn sanitize(reason: &str) -> String {
    reason
        .chars()
        .map(|c| if matches!(c, '\n' | '\r' | '\t') { ' ' } else { c })
        .collect()
}

/// Snapshot of the outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeCounts {
    pub processed: usize,
    pub warnings: usize,
    pub failed: usize,
}

/// The three outcome sinks for one run.
pub struct ProgressLog {
    dir: PathBuf,
    processed: Mutex<File>,
    warning: Mutex<File>,
    failed: Mutex<File>,
    n_processed: AtomicUsize,
    n_warning: AtomicUsize,
    n_failed: AtomicUsize,
}

impl ProgressLog {
    /// Open (creating if needed) the three logs under `dir` in append mode.
    pub async fn open(dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;

        Ok(Self {
            processed: Mutex::new(open_append(&dir, Outcome::Processed).await?),
            warning: Mutex::new(open_append(&dir, Outcome::Warning).await?),
            failed: Mutex::new(open_append(&dir, Outcome::Failed).await?),
            dir,
            n_processed: AtomicUsize::new(0),
            n_warning: AtomicUsize::new(0),
            n_failed: AtomicUsize::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Append one event. A write failure is logged and does not stop the run.
    pub async fn record(&self, event: &OutcomeEvent) {
        let (sink, counter) = match event.outcome {
            Outcome::Processed => (&self.processed, &self.n_processed),
            Outcome::Warning => (&self.warning, &self.n_warning),
            Outcome::Failed => (&self.failed, &self.n_failed),
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let line = event.to_line();
        let mut file = sink.lock().await;
        let written = async {
            file.write_all(line.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(e) = written {
            error!(
                researcher_id = %event.researcher_id,
                log = event.outcome.file_name(),
                error = %e,
                "Failed to append outcome"
            );
        }
    }

    pub async fn processed(&self, researcher_id: &str) {
        self.record(&OutcomeEvent::processed(researcher_id)).await;
    }

    pub async fn warning(&self, researcher_id: &str, reason: impl std::fmt::Display) {
        self.record(&OutcomeEvent::warning(researcher_id, reason)).await;
    }

    pub async fn failed(&self, researcher_id: &str, reason: impl std::fmt::Display) {
        self.record(&OutcomeEvent::failed(researcher_id, reason)).await;
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            processed: self.n_processed.load(Ordering::Relaxed),
            warnings: self.n_warning.load(Ordering::Relaxed),
            failed: self.n_failed.load(Ordering::Relaxed),
        }
    }
}

async fn open_append(dir: &Path, outcome: Outcome) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(outcome.file_name()))
        .await
}

/// Ids listed in one outcome log. A missing file is an empty set.
pub async fn read_ids(path: impl AsRef<Path>) -> std::io::Result<HashSet<String>> {
    let bytes = match tokio::fs::read(path.as_ref()).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e),
    };
    Ok(parse_ids(&String::from_utf8_lossy(&bytes)))
}

fn parse_ids(content: &str) -> HashSet<String> {
    content
        .lines()
        .filter_map(|line| line.split('\t').next())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ids to skip on this run: everything processed, plus everything that
/// failed when `skip_failed` is set. Warnings alone never skip a file.
pub async fn load_skip_set(
    dir: impl AsRef<Path>,
    skip_failed: bool,
) -> std::io::Result<HashSet<String>> {
    let dir = dir.as_ref();
    let mut skip = read_ids(dir.join(Outcome::Processed.file_name())).await?;
    if skip_failed {
        skip.extend(read_ids(dir.join(Outcome::Failed.file_name())).await?);
    }
    Ok(skip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_line_format() {
        assert_eq!(OutcomeEvent::processed("0001").to_line(), "0001\n");
        assert_eq!(
            OutcomeEvent::warning("0001", "batch rolled back:\nunique\tconstraint").to_line(),
            "0001\tbatch rolled back: unique constraint\n"
        );
        assert_eq!(OutcomeEvent::failed("0002", "bad xml").to_line(), "0002\tbad xml\n");
    }

    #[test]
    fn test_parse_ids_is_tolerant() {
        let ids = parse_ids("0001\n\n0002\tsome reason\n  \n00");
        assert!(ids.contains("0001"));
        assert!(ids.contains("0002"));
        assert!(ids.contains("00"), "truncated last line is still read");
        assert_eq!(ids.len(), 3);
    }

    #[tokio::test]
    async fn test_record_appends_and_counts() {
        let dir = TempDir::new().unwrap();
        {
            let log = ProgressLog::open(dir.path()).await.unwrap();
            log.processed("0001").await;
            log.warning("0001", "batch failed").await;
            log.failed("0002", "parse error").await;
            assert_eq!(
                log.counts(),
                OutcomeCounts { processed: 1, warnings: 1, failed: 1 }
            );
        }
        // Reopening appends rather than truncating.
        let log = ProgressLog::open(dir.path()).await.unwrap();
        log.processed("0003").await;
        assert_eq!(log.counts().processed, 1);

        let processed = std::fs::read_to_string(dir.path().join("processed.log")).unwrap();
        assert_eq!(processed, "0001\n0003\n");
        let failed = std::fs::read_to_string(dir.path().join("failed.log")).unwrap();
        assert_eq!(failed, "0002\tparse error\n");
    }

    #[tokio::test]
    async fn test_skip_set() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("processed.log"), "0001\n0002\n").unwrap();
        std::fs::write(dir.path().join("failed.log"), "0003\tboom\n").unwrap();
        std::fs::write(dir.path().join("warning.log"), "0004\tbatch\n").unwrap();

        let retry_failed = load_skip_set(dir.path(), false).await.unwrap();
        assert_eq!(retry_failed.len(), 2);
        assert!(!retry_failed.contains("0003"));
        assert!(!retry_failed.contains("0004"), "warnings alone never skip");

        let skip_failed = load_skip_set(dir.path(), true).await.unwrap();
        assert_eq!(skip_failed.len(), 3);
        assert!(skip_failed.contains("0003"));
    }

    #[tokio::test]
    async fn test_missing_logs_are_empty() {
        let dir = TempDir::new().unwrap();
        assert!(load_skip_set(dir.path().join("nope"), false).await.unwrap().is_empty());
    }
}
