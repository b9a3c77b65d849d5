// Stage transitions against a persistent catalog file
use music_tracker::{
    discover, CatalogError, LifecycleStore, ListFilter, Page, RefineRequest, SqliteCatalog, Stage,
    ToolFamily, WalkOptions,
};
use std::fs;
use tempfile::TempDir;

struct Fixture {
    _library: TempDir,
    _db_dir: TempDir,
    store: SqliteCatalog,
}

fn setup() -> Fixture {
    let library = TempDir::new().unwrap();
    for relative in ["beats/Track1.flp", "beats/Track2.flp", "Hymn/Hymn.song"] {
        let path = library.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"data").unwrap();
    }

    let db_dir = TempDir::new().unwrap();
    let mut store = SqliteCatalog::open(db_dir.path().join("music_tracker.db")).unwrap();
    let report = discover(&mut store, library.path(), &WalkOptions::default()).unwrap();
    assert_eq!(report.inserted, 3);

    Fixture {
        _library: library,
        _db_dir: db_dir,
        store,
    }
}

fn id_of(store: &SqliteCatalog, title: &str) -> i64 {
    store
        .all_entries()
        .unwrap()
        .into_iter()
        .find(|entry| entry.title() == title)
        .map(|entry| entry.id)
        .unwrap()
}

#[test]
fn test_refine_then_list_refined() {
    let mut fixture = setup();
    let id = id_of(&fixture.store, "Track1");

    let request = RefineRequest {
        description: Some("Warehouse roller".to_string()),
        genre: Some("Techno".to_string()),
        bpm: Some(132),
        key: Some("G minor".to_string()),
        year: Some(2021),
        status: Some("mixing".to_string()),
        rating: Some(7),
        tags: vec!["dark".to_string(), "warehouse".to_string()],
        collaboration: Some("Ana".to_string()),
        ..Default::default()
    };
    fixture.store.refine(id, &request).unwrap();

    let refined = fixture
        .store
        .list_by_stage(Stage::Refined, &ListFilter::default(), Page::all())
        .unwrap();
    assert_eq!(refined.len(), 1);
    assert_eq!(refined[0].id, id);

    let refinement = refined[0].refinement().unwrap();
    assert_eq!(refinement.description.as_deref(), Some("Warehouse roller"));
    assert_eq!(refinement.genre.as_deref(), Some("Techno"));
    assert_eq!(refinement.bpm, Some(132));
    assert_eq!(refinement.key.as_deref(), Some("G minor"));
    assert_eq!(refinement.year, Some(2021));
    assert_eq!(refinement.status, "mixing");
    assert_eq!(refinement.rating.map(|r| r.value()), Some(7));
    assert_eq!(refinement.tags.len(), 2);
    assert_eq!(refinement.collaboration.as_deref(), Some("Ana"));
}

#[test]
fn test_refining_a_rejected_entry_fails_and_changes_nothing() {
    let mut fixture = setup();
    let id = id_of(&fixture.store, "Track2");
    fixture.store.reject(id, "Not useful").unwrap();
    let before = fixture.store.find_by_id(id).unwrap().unwrap();

    let err = fixture
        .store
        .refine(id, &RefineRequest::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CatalogError::InvalidState {
            stage: Stage::Rejected,
            ..
        }
    ));
    assert_eq!(fixture.store.find_by_id(id).unwrap().unwrap(), before);
}

#[test]
fn test_missing_id_is_not_found() {
    let mut fixture = setup();
    assert!(matches!(
        fixture.store.reject(999, "x"),
        Err(CatalogError::NotFound(999))
    ));
}

#[test]
fn test_stats_after_transitions() {
    let mut fixture = setup();
    let track1 = id_of(&fixture.store, "Track1");
    let hymn = id_of(&fixture.store, "Hymn");
    fixture.store.refine(track1, &RefineRequest::default()).unwrap();
    fixture.store.reject(hymn, "Not useful").unwrap();

    let stats = fixture.store.stats().unwrap();
    assert_eq!(stats.raw, 1);
    assert_eq!(stats.refined, 1);
    assert_eq!(stats.rejected, 1);
    assert_eq!(stats.refined_by_tool.get(&ToolFamily::FlStudio), Some(&1));
}

#[test]
fn test_rejected_titles_block_rediscovery() {
    let mut fixture = setup();
    let hymn = id_of(&fixture.store, "Hymn");
    fixture.store.reject(hymn, "Not useful").unwrap();

    let library = fixture._library.path().to_path_buf();
    let report = discover(&mut fixture.store, &library, &WalkOptions::default()).unwrap();
    assert_eq!(report.inserted, 0);
    assert_eq!(report.duplicates, 3);
    assert_eq!(fixture.store.stats().unwrap().rejected, 1);
}
