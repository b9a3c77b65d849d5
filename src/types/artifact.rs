use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::tool::ToolFamily;

/// A project found on disk by the walker, before it is cataloged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectArtifact {
    /// Absolute path of the project file (or package directory).
    pub path: PathBuf,
    pub tool_family: ToolFamily,
    /// Canonical, non-blank title.
    pub title: String,
    pub size_bytes: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub modified_at: Option<DateTime<Utc>>,
    /// Project folder, present when the title was taken from it.
    pub folder_path: Option<PathBuf>,
    /// Other visible files sitting in the project folder.
    pub additional_files: Vec<String>,
}

impl ProjectArtifact {
    pub fn new(path: impl Into<PathBuf>, tool_family: ToolFamily, title: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tool_family,
            title: title.into(),
            size_bytes: 0,
            created_at: None,
            modified_at: None,
            folder_path: None,
            additional_files: Vec::new(),
        }
    }

    pub fn with_size(mut self, size_bytes: u64) -> Self {
        self.size_bytes = size_bytes;
        self
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.modified_at = modified_at;
        self
    }

    pub fn with_folder(mut self, folder: impl Into<PathBuf>, additional_files: Vec<String>) -> Self {
        self.folder_path = Some(folder.into());
        self.additional_files = additional_files;
        self
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}
