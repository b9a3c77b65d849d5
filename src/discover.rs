//! The `add` pipeline: walk a tree, reconcile titles, insert new raw entries.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CatalogError, Result};
use crate::reconcile::{Admission, Reconciler};
use crate::scanner::{ProjectWalker, WalkOptions, WalkStats};
use crate::storage::LifecycleStore;
use crate::types::{ProjectArtifact, ToolFamily};

/// Something that happened to one artifact during discovery.
#[derive(Debug)]
pub enum DiscoveryEvent<'a> {
    Added { id: i64, artifact: &'a ProjectArtifact },
    Duplicate(&'a ProjectArtifact),
    Failed(&'a CatalogError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddedProject {
    pub id: i64,
    pub title: String,
    pub tool_family: ToolFamily,
    pub path: PathBuf,
}

/// Summary of one discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryReport {
    pub root: PathBuf,
    pub inserted: usize,
    pub duplicates: usize,
    pub errors: usize,
    pub added: Vec<AddedProject>,
    /// One message per recoverable error.
    pub failures: Vec<String>,
    pub walk: WalkStats,
}

/// Discover projects under `root` and insert the new ones as raw entries.
///
/// Only an unreadable root or a store failure aborts the run. Unreadable entries
/// and untitleable artifacts are counted in `errors`; titles already in the catalog
/// (or claimed earlier in this run) are counted in `duplicates`.
pub fn discover<S>(store: &mut S, root: impl AsRef<Path>, options: &WalkOptions) -> Result<DiscoveryReport>
where
    S: LifecycleStore + ?Sized,
{
    discover_with(store, root, options, |_| {})
}

/// [`discover`], reporting each artifact's outcome to `observe` as it happens.
pub fn discover_with<S, F>(
    store: &mut S,
    root: impl AsRef<Path>,
    options: &WalkOptions,
    mut observe: F,
) -> Result<DiscoveryReport>
where
    S: LifecycleStore + ?Sized,
    F: FnMut(DiscoveryEvent<'_>),
{
    let mut walker = ProjectWalker::new(root, options)?;
    let mut reconciler = Reconciler::new(store.titles()?);
    let mut report = DiscoveryReport {
        root: walker.root().to_path_buf(),
        ..Default::default()
    };

    for item in walker.by_ref() {
        let artifact = match item {
            Ok(artifact) => artifact,
            Err(err) if err.is_recoverable() => {
                report.errors += 1;
                report.failures.push(err.to_string());
                observe(DiscoveryEvent::Failed(&err));
                continue;
            }
            Err(err) => return Err(err),
        };

        if reconciler.admit(&artifact) == Admission::Duplicate {
            report.duplicates += 1;
            observe(DiscoveryEvent::Duplicate(&artifact));
            continue;
        }

        match store.insert_raw(&artifact) {
            Ok(id) => {
                report.inserted += 1;
                observe(DiscoveryEvent::Added { id, artifact: &artifact });
                report.added.push(AddedProject {
                    id,
                    title: artifact.title,
                    tool_family: artifact.tool_family,
                    path: artifact.path,
                });
            }
            // The store's own constraint caught what the reconciler didn't
            Err(CatalogError::DuplicateTitle(_)) => {
                report.duplicates += 1;
                observe(DiscoveryEvent::Duplicate(&artifact));
            }
            Err(err) => return Err(err),
        }
    }

    report.walk = walker.stats().clone();
    info!(
        root = %report.root.display(),
        inserted = report.inserted,
        duplicates = report.duplicates,
        errors = report.errors,
        "Discovery finished"
    );
    Ok(report)
}
