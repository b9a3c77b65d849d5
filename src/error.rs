use std::path::PathBuf;
use thiserror::Error;

use crate::types::Stage;

/// Errors raised by discovery and by the lifecycle store.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The scan root could not be opened. Fatal to the whole `add` operation.
    #[error("Cannot read scan root {path}: {source}")]
    DiscoveryIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A single entry could not be read during traversal. Recovered locally.
    #[error("Cannot read entry {path}: {message}")]
    EntryRead { path: PathBuf, message: String },

    /// A project artifact for which no non-blank title could be derived.
    #[error("No usable title for {path}")]
    Untitled { path: PathBuf },

    #[error("A project titled '{0}' already exists in the catalog")]
    DuplicateTitle(String),

    #[error("No project with id {0}")]
    NotFound(i64),

    #[error("Project {id} is {stage}; only raw projects can be refined or rejected")]
    InvalidState { id: i64, stage: Stage },

    #[error("Rating must be between 1 and 10, got {0}")]
    InvalidRating(u8),

    #[error("Title must not be blank")]
    InvalidTitle,

    #[error("Project file not found: {0}")]
    ProjectFileMissing(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Whether discovery may count this error and keep walking.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EntryRead { .. } | Self::Untitled { .. })
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
