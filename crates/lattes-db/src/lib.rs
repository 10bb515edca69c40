//! Lattes Database Layer
//!
//! Relational storage for ingested curricula, backed by SQLite through sqlx.
//!
//! # Features
//!
//! - Eight-table curriculum schema plus the `advising` edge table
//! - Batch row collection with intra-batch dedup (`BatchRows`)
//! - One transaction per committed batch (`CurriculumStore`)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use lattes_db::{Database, SqlCurriculumStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("sqlite://lattes.db", 8).await?;
//!     db.initialize().await?;
//!
//!     let store = SqlCurriculumStore::new(Arc::new(db));
//!
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod schema;
pub mod rows;
pub mod store;

pub use database::{Database, DatabaseStats};
pub use error::{DbError, Result};
pub use rows::{BatchRows, DedupScope};
pub use schema::{
    TABLES, TABLE_ADDRESS, TABLE_ADVISING, TABLE_EDUCATION, TABLE_EXPERIENCE, TABLE_EXPERTISE,
    TABLE_INSTITUTION, TABLE_NATIONALITY, TABLE_RESEARCHER, TABLE_STUDY_FIELD,
};
pub use store::{CurriculumStore, SqlCurriculumStore};
