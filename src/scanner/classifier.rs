//! Path classification: is this path a canonical project artifact, a backup, or noise?
//!
//! Classification is a pure function of the path's components. File contents are
//! never opened.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};

use crate::types::ToolFamily;

/// Directory-name fragments that mark a backup folder. A folder whose name contains
/// any of these (case-insensitively) is never descended into, and nothing beneath
/// it is ever accepted.
pub const BACKUP_DIR_MARKERS: &[&str] = &["auto-backup", "auto-save", "backup"];

/// Trailing file-name markers left by editors and DAWs for backup/temporary copies.
pub const BACKUP_FILE_SUFFIXES: &[&str] = &[".bak", ".tmp", "~"];

/// Bracketed autosave timestamp, e.g. `Song [2024-05-25 151417].bwproject`.
static VERSION_STAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[\d{4}-\d{2}-\d{2}[ _T]\d{2}[:.\-]?\d{2}[:.\-]?\d{2}\]")
        .expect("version stamp pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkipReason {
    /// Lives under a backup/autosave folder.
    BackupFolder,
    /// Carries a trailing `.bak`, `.tmp` or `~` marker.
    BackupFile,
    /// Timestamped autosave snapshot of a canonical project file.
    Versioned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Accepted(ToolFamily),
    Skipped(SkipReason),
    Irrelevant,
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted(_))
    }
}

/// The single backup-folder predicate shared by the walker (pruning) and
/// [`classify`] (ancestor check).
pub fn is_backup_dir_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    BACKUP_DIR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Whether the file name carries a bracketed date-time autosave stamp.
pub fn is_versioned_name(name: &str) -> bool {
    VERSION_STAMP.is_match(name)
}

/// Strip every trailing backup marker, returning `None` when there was none.
fn strip_backup_suffixes(name: &str) -> Option<&str> {
    let mut current = name;
    loop {
        let lower = current.to_ascii_lowercase();
        let stripped = BACKUP_FILE_SUFFIXES
            .iter()
            .find(|suffix| lower.ends_with(*suffix))
            .map(|suffix| &current[..current.len() - suffix.len()]);

        match stripped {
            Some(rest) => current = rest,
            None => break,
        }
    }
    (current.len() != name.len()).then_some(current)
}

/// Classify a path. Callers that scan from a root should pass the path relative
/// to that root, so the root's own ancestors don't count as backup folders.
pub fn classify(path: &Path) -> Classification {
    // Lossy so non-UTF-8 names still get the extension and suffix rules
    let name = match path.file_name() {
        Some(name) => name.to_string_lossy(),
        None => return Classification::Irrelevant,
    };
    let name = name.as_ref();

    // "Song.flp.bak", "Song.flp~"
    if let Some(original) = strip_backup_suffixes(name) {
        return match ToolFamily::from_file_name(original) {
            Some(_) => Classification::Skipped(SkipReason::BackupFile),
            None => Classification::Irrelevant,
        };
    }

    let family = match ToolFamily::from_file_name(name) {
        Some(family) => family,
        None => return Classification::Irrelevant,
    };

    let in_backup_folder = path
        .parent()
        .map(|parent| {
            parent.components().any(|component| match component {
                Component::Normal(part) => is_backup_dir_name(&part.to_string_lossy()),
                _ => false,
            })
        })
        .unwrap_or(false);
    if in_backup_folder {
        return Classification::Skipped(SkipReason::BackupFolder);
    }

    if is_versioned_name(name) {
        return Classification::Skipped(SkipReason::Versioned);
    }

    Classification::Accepted(family)
}
