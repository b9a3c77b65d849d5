use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::{order_and_page, LifecycleStore, ListFilter, Page};
use crate::error::{CatalogError, Result};
use crate::types::{
    CatalogEntry, CatalogStats, ProjectArtifact, RefineRequest, Rejection, Stage, StageState,
};

/// In-memory catalog with the same semantics as the SQLite store.
///
/// Used for dry runs (a snapshot of the real catalog that is thrown away) and as
/// a test double. Entries are never removed, so indexes into `entries` stay valid.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    // Core data, in insertion (id) order
    entries: Vec<CatalogEntry>,

    // Fast indexes
    id_index: HashMap<i64, usize>,      // id -> position
    title_index: HashMap<String, usize>, // title -> position

    next_id: i64,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Build a catalog from existing entries, e.g. a snapshot of a persistent store.
    /// Fails with `DuplicateTitle` if two entries share a title.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Result<Self> {
        let mut catalog = Self::new();
        for entry in entries {
            if catalog.title_index.contains_key(entry.title()) {
                return Err(CatalogError::DuplicateTitle(entry.title().to_string()));
            }
            catalog.next_id = catalog.next_id.max(entry.id + 1);
            catalog.push(entry);
        }
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: CatalogEntry) {
        let position = self.entries.len();
        self.id_index.insert(entry.id, position);
        self.title_index.insert(entry.title().to_string(), position);
        self.entries.push(entry);
    }

    /// Position of a raw entry, or the transition error for `id`.
    fn raw_position(&self, id: i64) -> Result<usize> {
        let position = *self.id_index.get(&id).ok_or(CatalogError::NotFound(id))?;
        self.entries[position].ensure_raw()?;
        Ok(position)
    }
}

impl LifecycleStore for MemoryCatalog {
    fn insert_raw(&mut self, artifact: &ProjectArtifact) -> Result<i64> {
        if self.title_index.contains_key(&artifact.title) {
            return Err(CatalogError::DuplicateTitle(artifact.title.clone()));
        }

        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.push(CatalogEntry {
            id,
            artifact: artifact.clone(),
            discovered_at: Utc::now(),
            state: StageState::Raw,
        });
        debug!(id, title = %artifact.title, "Inserted raw project (in memory)");
        Ok(id)
    }

    fn list_by_stage(&self, stage: Stage, filter: &ListFilter, page: Page) -> Result<Vec<CatalogEntry>> {
        let matching = self
            .entries
            .iter()
            .filter(|entry| entry.stage() == stage && filter.matches(entry))
            .cloned()
            .collect();
        Ok(order_and_page(matching, page))
    }

    fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>> {
        Ok(self
            .id_index
            .get(&id)
            .and_then(|&position| self.entries.get(position))
            .cloned())
    }

    fn find_by_title(&self, fragment: &str) -> Result<Vec<CatalogEntry>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.title().to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    fn refine(&mut self, id: i64, request: &RefineRequest) -> Result<CatalogEntry> {
        let position = self.raw_position(id)?;
        let current_title = self.entries[position].title().to_string();

        let new_title = request.new_title()?;
        if let Some(title) = &new_title {
            if *title != current_title && self.title_index.contains_key(title) {
                return Err(CatalogError::DuplicateTitle(title.clone()));
            }
        }
        let refinement = request.to_refinement(self.entries[position].artifact.created_at, Utc::now())?;

        // Validation is done; nothing below can fail
        if let Some(title) = new_title {
            self.title_index.remove(&current_title);
            self.title_index.insert(title.clone(), position);
            self.entries[position].artifact.title = title;
        }
        let entry = &mut self.entries[position];
        entry.state = StageState::Refined(refinement);
        Ok(entry.clone())
    }

    fn reject(&mut self, id: i64, reason: &str) -> Result<CatalogEntry> {
        let position = self.raw_position(id)?;
        let entry = &mut self.entries[position];
        entry.state = StageState::Rejected(Rejection {
            reason: reason.to_string(),
            rejected_at: Utc::now(),
        });
        Ok(entry.clone())
    }

    fn stats(&self) -> Result<CatalogStats> {
        let mut stats = CatalogStats::default();
        for entry in &self.entries {
            stats.record(entry.stage(), entry.tool_family(), 1);
        }
        Ok(stats)
    }

    fn all_entries(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.clone())
    }

    fn titles(&self) -> Result<HashSet<String>> {
        Ok(self.title_index.keys().cloned().collect())
    }
}
