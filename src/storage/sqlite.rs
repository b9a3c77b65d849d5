//! SQLite-backed lifecycle store. One `projects` table; the title column carries the
//! catalog-wide uniqueness constraint.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::{params, Connection, Row};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{LifecycleStore, ListFilter, Page};
use crate::error::{CatalogError, Result};
use crate::types::{
    CatalogEntry, CatalogStats, ProjectArtifact, Rating, RefineRequest, Refinement, Rejection,
    Stage, StageState, ToolFamily,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS projects (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    path             TEXT NOT NULL,
    tool_family      TEXT NOT NULL,
    title            TEXT NOT NULL UNIQUE,
    size_bytes       INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT,
    modified_at      TEXT,
    folder_path      TEXT,
    additional_files TEXT NOT NULL DEFAULT '[]',
    discovered_at    TEXT NOT NULL,
    stage            TEXT NOT NULL DEFAULT 'raw' CHECK (stage IN ('raw', 'refined', 'rejected')),
    description      TEXT,
    genre            TEXT,
    bpm              INTEGER,
    music_key        TEXT,
    year             INTEGER,
    status           TEXT,
    rating           INTEGER CHECK (rating IS NULL OR rating BETWEEN 1 AND 10),
    tags             TEXT,
    collaboration    TEXT,
    refined_at       TEXT,
    reason           TEXT,
    rejected_at      TEXT
);
CREATE INDEX IF NOT EXISTS idx_projects_stage ON projects(stage);
CREATE INDEX IF NOT EXISTS idx_projects_tool_family ON projects(tool_family);
";

const ENTRY_COLUMNS: &str = "id, path, tool_family, title, size_bytes, created_at, modified_at, \
    folder_path, additional_files, discovered_at, stage, description, genre, bpm, music_key, \
    year, status, rating, tags, collaboration, refined_at, reason, rejected_at";

impl ToSql for ToolFamily {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ToolFamily {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: CatalogError| FromSqlError::Other(Box::new(err)))
    }
}

impl ToSql for Stage {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Stage {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: CatalogError| FromSqlError::Other(Box::new(err)))
    }
}

/// Fixed-width RFC 3339 so text ordering matches time ordering.
fn encode_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => DateTime::parse_from_rfc3339(&text)
            .map(|timestamp| Some(timestamp.with_timezone(&Utc)))
            .map_err(|err| conversion_error(idx, err)),
        None => Ok(None),
    }
}

fn required_timestamp_at(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    timestamp_at(row, idx)?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(idx, "timestamp".to_string(), Type::Null)
    })
}

fn json_at<T: serde::de::DeserializeOwned + Default>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    match row.get::<_, Option<String>>(idx)? {
        Some(text) => serde_json::from_str(&text).map_err(|err| conversion_error(idx, err)),
        None => Ok(T::default()),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Parse a full entry from a row selected with `ENTRY_COLUMNS`.
fn parse_entry_row(row: &Row) -> rusqlite::Result<CatalogEntry> {
    let size_bytes: i64 = row.get(4)?;
    let stage: Stage = row.get(10)?;

    let state = match stage {
        Stage::Raw => StageState::Raw,
        Stage::Refined => {
            let rating = row
                .get::<_, Option<u8>>(17)?
                .map(Rating::try_from)
                .transpose()
                .map_err(|err| conversion_error(17, err))?;
            StageState::Refined(Refinement {
                description: row.get(11)?,
                genre: row.get(12)?,
                bpm: row.get(13)?,
                key: row.get(14)?,
                year: row.get(15)?,
                status: row.get::<_, Option<String>>(16)?.unwrap_or_default(),
                rating,
                tags: json_at::<BTreeSet<String>>(row, 18)?,
                collaboration: row.get(19)?,
                refined_at: required_timestamp_at(row, 20)?,
            })
        }
        Stage::Rejected => StageState::Rejected(Rejection {
            reason: row.get::<_, Option<String>>(21)?.unwrap_or_default(),
            rejected_at: required_timestamp_at(row, 22)?,
        }),
    };

    let artifact = ProjectArtifact {
        path: PathBuf::from(row.get::<_, String>(1)?),
        tool_family: row.get(2)?,
        title: row.get(3)?,
        size_bytes: size_bytes.max(0) as u64,
        created_at: timestamp_at(row, 5)?,
        modified_at: timestamp_at(row, 6)?,
        folder_path: row.get::<_, Option<String>>(7)?.map(PathBuf::from),
        additional_files: json_at(row, 8)?,
    };

    Ok(CatalogEntry {
        id: row.get(0)?,
        artifact,
        discovered_at: required_timestamp_at(row, 9)?,
        state,
    })
}

fn load_entry(conn: &Connection, id: i64) -> Result<Option<CatalogEntry>> {
    let sql = format!("SELECT {} FROM projects WHERE id = ?1", ENTRY_COLUMNS);
    let mut stmt = conn.prepare_cached(&sql)?;
    match stmt.query_row(params![id], parse_entry_row) {
        Ok(entry) => Ok(Some(entry)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Catalog stored in a single SQLite file.
pub struct SqliteCatalog {
    conn: Connection,
}

impl SqliteCatalog {
    /// Open (creating if needed) the catalog at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let catalog = Self::init(conn)?;
        info!(path = %path.display(), "Opened catalog");
        Ok(catalog)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    fn query_entries(&self, sql: &str, params: impl rusqlite::Params) -> Result<Vec<CatalogEntry>> {
        let mut stmt = self.conn.prepare_cached(sql)?;
        let entries = stmt
            .query_map(params, parse_entry_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

impl LifecycleStore for SqliteCatalog {
    fn insert_raw(&mut self, artifact: &ProjectArtifact) -> Result<i64> {
        let additional_files = serde_json::to_string(&artifact.additional_files)?;
        let result = self.conn.execute(
            "INSERT INTO projects (path, tool_family, title, size_bytes, created_at, modified_at, \
             folder_path, additional_files, discovered_at, stage) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                artifact.path.to_string_lossy().into_owned(),
                artifact.tool_family,
                artifact.title,
                i64::try_from(artifact.size_bytes).unwrap_or(i64::MAX),
                artifact.created_at.as_ref().map(encode_timestamp),
                artifact.modified_at.as_ref().map(encode_timestamp),
                artifact.folder_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                additional_files,
                encode_timestamp(&Utc::now()),
                Stage::Raw,
            ],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                debug!(id, title = %artifact.title, "Inserted raw project");
                Ok(id)
            }
            Err(err) if is_unique_violation(&err) => Err(CatalogError::DuplicateTitle(artifact.title.clone())),
            Err(err) => Err(err.into()),
        }
    }

    fn list_by_stage(&self, stage: Stage, filter: &ListFilter, page: Page) -> Result<Vec<CatalogEntry>> {
        let order_column = match stage {
            Stage::Raw => "discovered_at",
            Stage::Refined => "refined_at",
            Stage::Rejected => "rejected_at",
        };
        let sql = format!(
            "SELECT {} FROM projects \
             WHERE stage = ?1 AND (?2 IS NULL OR tool_family = ?2) \
             ORDER BY {} DESC, id DESC LIMIT ?3 OFFSET ?4",
            ENTRY_COLUMNS, order_column
        );
        // SQLite treats a negative LIMIT as no limit
        let limit = page
            .limit
            .map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let offset = i64::try_from(page.offset).unwrap_or(i64::MAX);
        self.query_entries(&sql, params![stage, filter.tool_family, limit, offset])
    }

    fn find_by_id(&self, id: i64) -> Result<Option<CatalogEntry>> {
        load_entry(&self.conn, id)
    }

    fn find_by_title(&self, fragment: &str) -> Result<Vec<CatalogEntry>> {
        // SQLite's LIKE only folds ASCII, so matching happens here
        let needle = fragment.to_lowercase();
        Ok(self
            .all_entries()?
            .into_iter()
            .filter(|entry| entry.title().to_lowercase().contains(&needle))
            .collect())
    }

    fn refine(&mut self, id: i64, request: &RefineRequest) -> Result<CatalogEntry> {
        let tx = self.conn.transaction()?;
        let entry = load_entry(&tx, id)?.ok_or(CatalogError::NotFound(id))?;
        entry.ensure_raw()?;

        let title = request
            .new_title()?
            .unwrap_or_else(|| entry.artifact.title.clone());
        let refinement = request.to_refinement(entry.artifact.created_at, Utc::now())?;
        let tags = serde_json::to_string(&refinement.tags)?;

        let updated = tx.execute(
            "UPDATE projects SET title = ?2, stage = ?3, description = ?4, genre = ?5, bpm = ?6, \
             music_key = ?7, year = ?8, status = ?9, rating = ?10, tags = ?11, collaboration = ?12, \
             refined_at = ?13 \
             WHERE id = ?1 AND stage = 'raw'",
            params![
                id,
                title,
                Stage::Refined,
                refinement.description,
                refinement.genre,
                refinement.bpm,
                refinement.key,
                refinement.year,
                refinement.status,
                refinement.rating.map(Rating::value),
                tags,
                refinement.collaboration,
                encode_timestamp(&refinement.refined_at),
            ],
        );
        match updated {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(CatalogError::DuplicateTitle(title)),
            Err(err) => return Err(err.into()),
        }
        tx.commit()?;

        info!(id, title = %title, "Refined project");
        load_entry(&self.conn, id)?.ok_or(CatalogError::NotFound(id))
    }

    fn reject(&mut self, id: i64, reason: &str) -> Result<CatalogEntry> {
        let tx = self.conn.transaction()?;
        let entry = load_entry(&tx, id)?.ok_or(CatalogError::NotFound(id))?;
        entry.ensure_raw()?;

        tx.execute(
            "UPDATE projects SET stage = ?2, reason = ?3, rejected_at = ?4 WHERE id = ?1 AND stage = 'raw'",
            params![id, Stage::Rejected, reason, encode_timestamp(&Utc::now())],
        )?;
        tx.commit()?;

        info!(id, title = %entry.title(), reason, "Rejected project");
        load_entry(&self.conn, id)?.ok_or(CatalogError::NotFound(id))
    }

    fn stats(&self) -> Result<CatalogStats> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT stage, tool_family, COUNT(*) FROM projects GROUP BY stage, tool_family",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, Stage>(0)?,
                    row.get::<_, ToolFamily>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stats = CatalogStats::default();
        for (stage, tool_family, count) in rows {
            stats.record(stage, tool_family, count.max(0) as usize);
        }
        Ok(stats)
    }

    fn all_entries(&self) -> Result<Vec<CatalogEntry>> {
        let sql = format!("SELECT {} FROM projects ORDER BY id", ENTRY_COLUMNS);
        self.query_entries(&sql, [])
    }

    fn titles(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare_cached("SELECT title FROM projects")?;
        let titles: HashSet<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        Ok(titles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::contract;
    use tempfile::TempDir;

    fn catalog() -> SqliteCatalog {
        SqliteCatalog::open_in_memory().unwrap()
    }

    #[test]
    fn test_insert_and_find() {
        contract::insert_and_find(&mut catalog());
    }

    #[test]
    fn test_duplicate_title_is_rejected() {
        contract::duplicate_title_is_rejected(&mut catalog());
    }

    #[test]
    fn test_refine_then_list() {
        contract::refine_then_list(&mut catalog());
    }

    #[test]
    fn test_refine_rejected_fails_unchanged() {
        contract::refine_rejected_fails_unchanged(&mut catalog());
    }

    #[test]
    fn test_transitions_on_missing_id() {
        contract::transitions_on_missing_id(&mut catalog());
    }

    #[test]
    fn test_invalid_refinement_leaves_entry_raw() {
        contract::invalid_refinement_leaves_entry_raw(&mut catalog());
    }

    #[test]
    fn test_find_by_title_is_case_insensitive() {
        contract::find_by_title_is_case_insensitive(&mut catalog());
    }

    #[test]
    fn test_list_filters_and_pages() {
        contract::list_filters_and_pages(&mut catalog());
    }

    #[test]
    fn test_stats_count_refined_per_tool() {
        contract::stats_count_refined_per_tool(&mut catalog());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("music_tracker.db");

        let artifact = contract::artifact("Hymn", ToolFamily::StudioOne)
            .with_folder("/music/Hymn", vec!["vocals.wav".to_string()]);
        let id = {
            let mut catalog = SqliteCatalog::open(&db_path).unwrap();
            catalog.insert_raw(&artifact).unwrap()
        };

        let catalog = SqliteCatalog::open(&db_path).unwrap();
        let entry = catalog.find_by_id(id).unwrap().unwrap();
        assert_eq!(entry.artifact, artifact);
        assert!(catalog.titles().unwrap().contains("Hymn"));
    }

    #[test]
    fn test_title_constraint_holds_for_direct_sql() {
        let mut catalog = catalog();
        catalog
            .insert_raw(&contract::artifact("Track1", ToolFamily::FlStudio))
            .unwrap();

        let result = catalog.conn.execute(
            "INSERT INTO projects (path, tool_family, title, discovered_at) VALUES ('/x', 'fl-studio', 'Track1', '2024-01-01T00:00:00Z')",
            [],
        );
        assert!(matches!(result, Err(ref err) if is_unique_violation(err)));
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = "2024-01-01T00:00:00.5Z".parse::<DateTime<Utc>>().unwrap();
        let late = "2024-01-01T00:00:00.123456789Z".parse::<DateTime<Utc>>().unwrap();
        let whole = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        assert!(encode_timestamp(&whole) < encode_timestamp(&late));
        assert!(encode_timestamp(&late) < encode_timestamp(&early));
    }
}
