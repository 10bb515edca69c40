use thiserror::Error;

#[derive(Debug, Error)]
pub enum LattesError {
    /// The document is not well-formed XML. Fatal for that file only.
    #[error("malformed curriculum {researcher_id}: {message}")]
    Parse {
        researcher_id: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LattesError {
    pub fn parse(researcher_id: impl Into<String>, message: impl std::fmt::Display) -> Self {
        LattesError::Parse {
            researcher_id: researcher_id.into(),
            message: message.to_string(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        LattesError::Config(message.into())
    }

    /// Configuration errors abort the whole run; everything else is contained.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LattesError::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, LattesError>;
