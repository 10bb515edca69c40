//! Database error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQL error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Invalid database url: {0}")]
    InvalidUrl(String),
}

impl DbError {
    /// Classify a sqlx error, surfacing constraint violations as their own variant.
    pub fn classify(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
            {
                return DbError::Constraint(db_err.message().to_string());
            }
        }
        DbError::Sqlx(err)
    }
}

impl From<DbError> for lattes_common::LattesError {
    fn from(err: DbError) -> Self {
        lattes_common::LattesError::Storage(err.to_string())
    }
}
