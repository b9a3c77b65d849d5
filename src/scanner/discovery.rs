use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use walkdir::{DirEntry, WalkDir};

use super::classifier::{classify, is_backup_dir_name, Classification};
use super::title;
use crate::error::{CatalogError, Result};
use crate::types::{ProjectArtifact, ToolFamily};

/// Traversal options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOptions {
    pub follow_symlinks: bool,
    pub max_depth: Option<usize>,
}

/// Counters collected while walking. `entries_inspected` counts every entry the
/// walker looked at; entries inside pruned directories never reach it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkStats {
    pub dirs_entered: usize,
    pub entries_inspected: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub irrelevant: usize,
    pub pruned_dirs: usize,
    pub cycles_refused: usize,
    pub errors: usize,
}

#[derive(Debug, Clone)]
struct ListedEntry {
    name: String,
    is_file: bool,
}

enum DirDecision {
    Descend,
    Prune,
    Package(ToolFamily),
    Failed(CatalogError),
}

/// Depth-first, lazy walk over a directory tree yielding project artifacts.
///
/// Backup folders are pruned before anything inside them is read, project
/// packages are yielded and never descended into, and every physical directory is
/// entered at most once so symlink cycles terminate. Per-entry failures come out
/// as `Err` items and the walk carries on.
pub struct ProjectWalker {
    root: PathBuf,
    entries: walkdir::IntoIter,
    visited: HashSet<PathBuf>,
    // Sibling listing of the most recent artifact's parent only
    last_listing: Option<(PathBuf, Vec<ListedEntry>)>,
    stats: WalkStats,
}

impl ProjectWalker {
    /// Open `root` for walking. An unreadable root is a `DiscoveryIo` error.
    pub fn new(root: impl AsRef<Path>, options: &WalkOptions) -> Result<Self> {
        let requested = root.as_ref();
        let root = fs::canonicalize(requested).map_err(|source| CatalogError::DiscoveryIo {
            path: requested.to_path_buf(),
            source,
        })?;
        fs::read_dir(&root).map_err(|source| CatalogError::DiscoveryIo {
            path: root.clone(),
            source,
        })?;

        let mut walk = WalkDir::new(&root)
            .follow_links(options.follow_symlinks)
            .sort_by_file_name();
        if let Some(depth) = options.max_depth {
            walk = walk.max_depth(depth);
        }

        info!(root = %root.display(), follow_symlinks = options.follow_symlinks, "Starting project walk");

        let mut visited = HashSet::new();
        visited.insert(root.clone());

        Ok(Self {
            root,
            entries: walk.into_iter(),
            visited,
            last_listing: None,
            stats: WalkStats::default(),
        })
    }

    /// Canonical root being walked.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> &WalkStats {
        &self.stats
    }

    fn fail(&mut self, err: CatalogError) -> CatalogError {
        self.stats.errors += 1;
        warn!(error = %err, "Discovery error");
        err
    }

    fn enter_directory(&mut self, entry: &DirEntry, relative: &Path) -> DirDecision {
        let name = entry.file_name().to_string_lossy();

        if is_backup_dir_name(&name) {
            self.stats.pruned_dirs += 1;
            debug!(path = %entry.path().display(), "Pruning backup folder");
            return DirDecision::Prune;
        }

        match classify(relative) {
            Classification::Accepted(family) if family.is_package() => {
                return DirDecision::Package(family);
            }
            Classification::Skipped(reason) if names_package(&name) => {
                self.stats.skipped += 1;
                trace!(path = %entry.path().display(), ?reason, "Skipping package");
                return DirDecision::Prune;
            }
            _ => {}
        }

        match fs::canonicalize(entry.path()) {
            Ok(physical) => {
                if !self.visited.insert(physical) {
                    self.stats.cycles_refused += 1;
                    debug!(path = %entry.path().display(), "Directory already visited, not re-entering");
                    return DirDecision::Prune;
                }
            }
            Err(err) => {
                return DirDecision::Failed(CatalogError::EntryRead {
                    path: entry.path().to_path_buf(),
                    message: err.to_string(),
                });
            }
        }

        self.stats.dirs_entered += 1;
        DirDecision::Descend
    }

    fn listing(&mut self, dir: &Path) -> io::Result<&[ListedEntry]> {
        let cached = matches!(&self.last_listing, Some((cached_dir, _)) if cached_dir == dir);
        if !cached {
            self.last_listing = Some((dir.to_path_buf(), read_listing(dir)?));
        }
        Ok(self
            .last_listing
            .as_ref()
            .map(|(_, listing)| listing.as_slice())
            .unwrap_or_default())
    }

    fn build_artifact(&mut self, entry: &DirEntry, family: ToolFamily) -> Result<ProjectArtifact> {
        let path = entry.path().to_path_buf();
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                return Err(self.fail(CatalogError::EntryRead {
                    path,
                    message: err.to_string(),
                }))
            }
        };
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        let artifact_name = entry.file_name().to_string_lossy().into_owned();

        let (sibling_names, folder_files) = match self.listing(&parent) {
            Ok(listing) => {
                let names: Vec<String> = listing.iter().map(|e| e.name.clone()).collect();
                let files: Vec<String> = listing
                    .iter()
                    .filter(|e| e.is_file && e.name != artifact_name && !e.name.starts_with('.'))
                    .map(|e| e.name.clone())
                    .collect();
                (names, files)
            }
            Err(err) => {
                return Err(self.fail(CatalogError::EntryRead {
                    path: parent,
                    message: err.to_string(),
                }))
            }
        };

        let resolved = match title::resolve(&path, family, &sibling_names) {
            Some(resolved) => resolved,
            None => return Err(self.fail(CatalogError::Untitled { path })),
        };

        let size_bytes = if entry.file_type().is_dir() {
            package_size(&path)
        } else {
            metadata.len()
        };
        let created_at = metadata
            .created()
            .or_else(|_| metadata.modified())
            .ok()
            .map(DateTime::<Utc>::from);
        let modified_at = metadata.modified().ok().map(DateTime::<Utc>::from);

        self.stats.accepted += 1;
        debug!(path = %path.display(), title = %resolved.title, daw = %family, "Found project");

        let mut artifact = ProjectArtifact::new(path, family, resolved.title)
            .with_size(size_bytes)
            .with_timestamps(created_at, modified_at);
        if resolved.from_folder {
            artifact = artifact.with_folder(parent, folder_files);
        }
        Ok(artifact)
    }
}

impl Iterator for ProjectWalker {
    type Item = Result<ProjectArtifact>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    if let Some(ancestor) = err.loop_ancestor() {
                        self.stats.cycles_refused += 1;
                        debug!(
                            path = ?err.path(),
                            ancestor = %ancestor.display(),
                            "Symlink loop, not re-entering"
                        );
                        continue;
                    }
                    let path = err
                        .path()
                        .map(Path::to_path_buf)
                        .unwrap_or_else(|| self.root.clone());
                    return Some(Err(self.fail(CatalogError::EntryRead {
                        path,
                        message: err.to_string(),
                    })));
                }
            };

            if entry.depth() == 0 {
                continue;
            }
            self.stats.entries_inspected += 1;

            let relative = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or_else(|_| entry.path())
                .to_path_buf();

            if entry.file_type().is_dir() {
                match self.enter_directory(&entry, &relative) {
                    DirDecision::Descend => continue,
                    DirDecision::Prune => {
                        self.entries.skip_current_dir();
                        continue;
                    }
                    DirDecision::Package(family) => {
                        self.entries.skip_current_dir();
                        return Some(self.build_artifact(&entry, family));
                    }
                    DirDecision::Failed(err) => {
                        self.entries.skip_current_dir();
                        return Some(Err(self.fail(err)));
                    }
                }
            }

            match classify(&relative) {
                Classification::Accepted(family) => return Some(self.build_artifact(&entry, family)),
                Classification::Skipped(reason) => {
                    self.stats.skipped += 1;
                    trace!(path = %entry.path().display(), ?reason, "Skipped");
                }
                Classification::Irrelevant => {
                    self.stats.irrelevant += 1;
                }
            }
        }
    }
}

/// Whether a directory name carries a package extension anywhere in it.
fn names_package(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    ToolFamily::ALL
        .iter()
        .filter(|family| family.is_package())
        .any(|family| lower.contains(&format!(".{}", family.extension())))
}

fn read_listing(dir: &Path) -> io::Result<Vec<ListedEntry>> {
    let mut listing = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        listing.push(ListedEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_file: entry.file_type().map(|t| t.is_file()).unwrap_or(false),
        });
    }
    listing.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(listing)
}

/// Total size of the regular files inside a package directory.
fn package_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|metadata| metadata.len())
        .sum()
}
