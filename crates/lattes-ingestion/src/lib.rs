//! lattes-ingestion — Bulk curricula ingestion pipeline.
//! Covers:
//! - Null-safe XML access over Lattes documents
//! - Curriculum extraction and institution cross-referencing
//! - Batched transactional persistence with per-curriculum fallback
//! - Outcome logs and resume skip-set
//! - Serial and pooled subdirectory scanning

pub mod xml;
pub mod institution;
pub mod parser;
pub mod progress;
pub mod repository;
pub mod concurrency;
pub mod config;
pub mod scanner;

pub use concurrency::{ConcurrencyStrategy, Pool, Serial, SubdirReport, SubdirectoryHandler};
pub use config::{IngestConfig, StrategyKind};
pub use parser::parse_curriculum;
pub use progress::{Outcome, OutcomeEvent, ProgressLog};
pub use repository::{BatchRepository, BatchStats};
pub use scanner::{run, RunContext, RunSummary};
