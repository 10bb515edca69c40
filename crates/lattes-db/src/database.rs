//! Database connection and table management.
//!
//! Wraps an sqlx SQLite pool. Every flush acquires its own pooled
//! connection, so workers never share a session.

use crate::error::{DbError, Result};
use crate::schema;
use lattes_common::Institution;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

/// Main database handle.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

/// Row counts per table.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DatabaseStats {
    pub researchers: i64,
    pub institutions: i64,
    pub education: i64,
    pub experience: i64,
    pub expertise: i64,
}

impl Database {
    /// Open or create the database at `url` (e.g. `sqlite://lattes.db`).
    pub async fn open(url: &str, max_connections: u32) -> Result<Self> {
        Self::open_with(url, max_connections, true).await
    }

    /// Open the database at `url`; with `create_if_missing` unset a missing
    /// file is an error.
    pub async fn open_with(url: &str, max_connections: u32, create_if_missing: bool) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DbError::InvalidUrl(format!("{url}: {e}")))?
            .create_if_missing(create_if_missing)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::debug!(url, max_connections, "Database pool opened");

        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables and indexes that do not exist yet.
    pub async fn initialize(&self) -> Result<()> {
        for statement in schema::CREATE_STATEMENTS {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Count rows in one of the schema tables.
    pub async fn count(&self, table: &str) -> Result<i64> {
        if !schema::TABLES.contains(&table) {
            return Err(DbError::TableNotFound(table.to_string()));
        }
        // Table name checked against the fixed schema list above.
        let sql = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn stats(&self) -> Result<DatabaseStats> {
        Ok(DatabaseStats {
            researchers: self.count(schema::TABLE_RESEARCHER).await?,
            institutions: self.count(schema::TABLE_INSTITUTION).await?,
            education: self.count(schema::TABLE_EDUCATION).await?,
            experience: self.count(schema::TABLE_EXPERIENCE).await?,
            expertise: self.count(schema::TABLE_EXPERTISE).await?,
        })
    }

    pub async fn researcher_exists(&self, id: &str) -> Result<bool> {
        let found: Option<String> = sqlx::query_scalar("SELECT id FROM researcher WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    /// Look up an institution by code.
    pub async fn institution(&self, code: &str) -> Result<Option<Institution>> {
        let row: Option<(String, Option<String>, Option<String>, Option<String>, Option<String>)> =
            sqlx::query_as(
                "SELECT code, name, abbreviation, country, state FROM institution WHERE code = ?",
            )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(code, name, abbreviation, country, state)| Institution {
            code,
            name,
            abbreviation,
            country,
            state,
        }))
    }

    /// Lattes ids of researchers advised by `advisor_id`, resolved by id lookup.
    pub async fn advised_researchers(&self, advisor_id: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT r.id
            FROM advising a
            JOIN researcher r ON r.id = a.student_id
            WHERE a.advisor_id = ?
            ORDER BY r.id
            "#,
        )
        .bind(advisor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
