//! Lifecycle store: persisted catalog entries and their stage transitions.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryCatalog;
pub use sqlite::SqliteCatalog;

use std::collections::HashSet;

use crate::error::Result;
use crate::types::{CatalogEntry, CatalogStats, ProjectArtifact, RefineRequest, Stage, ToolFamily};

/// Optional filters for stage listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub tool_family: Option<ToolFamily>,
}

impl ListFilter {
    pub fn tool(tool_family: ToolFamily) -> Self {
        Self {
            tool_family: Some(tool_family),
        }
    }

    pub fn matches(&self, entry: &CatalogEntry) -> bool {
        self.tool_family
            .map_or(true, |family| entry.tool_family() == family)
    }
}

/// Limit/offset pagination. `limit: None` means everything after `offset`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Page {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            offset: 0,
        }
    }
}

/// Operations the CLI and the discovery pipeline need from a catalog.
///
/// Titles are unique across every stage. Transitions only leave `Raw`; a failed
/// transition leaves the entry exactly as it was.
pub trait LifecycleStore {
    /// Insert a newly discovered artifact as a raw entry and return its id.
    /// Fails with `DuplicateTitle` if the title is already taken.
    fn insert_raw(&mut self, artifact: &ProjectArtifact) -> Result<i64>;

    /// Entries in `stage`, most recent stage timestamp first (ties by id, newest first).
    fn list_by_stage(&self, stage: Stage, filter: &ListFilter, page: Page) -> Result<Vec<CatalogEntry>>;

    fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>>;

    /// Case-insensitive substring match on the title, ordered by id.
    fn find_by_title(&self, fragment: &str) -> Result<Vec<CatalogEntry>>;

    /// Raw -> Refined. Fails with `NotFound`, `InvalidState`, `InvalidRating`,
    /// `InvalidTitle` or `DuplicateTitle`.
    fn refine(&mut self, id: i64, request: &RefineRequest) -> Result<CatalogEntry>;

    /// Raw -> Rejected. Fails with `NotFound` or `InvalidState`.
    fn reject(&mut self, id: i64, reason: &str) -> Result<CatalogEntry>;

    fn stats(&self) -> Result<CatalogStats>;

    /// Every entry, ordered by id.
    fn all_entries(&self) -> Result<Vec<CatalogEntry>>;

    /// Every title in the catalog regardless of stage.
    fn titles(&self) -> Result<HashSet<String>> {
        Ok(self
            .all_entries()?
            .into_iter()
            .map(|entry| entry.artifact.title)
            .collect())
    }
}

/// Sort newest-first by stage timestamp, then apply the page.
pub(crate) fn order_and_page(mut entries: Vec<CatalogEntry>, page: Page) -> Vec<CatalogEntry> {
    entries.sort_by(|a, b| {
        b.stage_timestamp()
            .cmp(&a.stage_timestamp())
            .then_with(|| b.id.cmp(&a.id))
    });
    let rest = entries.into_iter().skip(page.offset);
    match page.limit {
        Some(limit) => rest.take(limit).collect(),
        None => rest.collect(),
    }
}
