// End-to-end discovery over real directory trees into the SQLite catalog
use music_tracker::{
    discover, LifecycleStore, ListFilter, Page, ProjectWalker, SqliteCatalog, Stage, ToolFamily,
    WalkOptions,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, b"project data").unwrap();
    path
}

/// A library with one project per DAW plus the usual noise.
fn create_library(root: &Path) {
    touch(root, "FL/2021/Track1.flp");
    touch(root, "FL/2021/Track1.flp.bak");
    touch(root, "FL/Backup/Track1.flp");
    touch(root, "Logic/Song A/Song A.logicx/Alternatives/000/ProjectData");
    touch(root, "Logic/Misc/Song B.logicx/Resources/ProjectInformation.plist");
    touch(root, "Logic/Misc/notes.txt");
    touch(root, "Logic/Misc/reference.mp3");
    touch(root, "Studio One/Hymn/Hymn.song");
    touch(root, "Studio One/Hymn/History/Hymn.song.autosave~");
    touch(root, "Bitwig/Night Drive/Song.bwproject");
    touch(root, "Bitwig/Night Drive/Song [2024-05-25 151417].bwproject");
    touch(root, "Bitwig/Night Drive/auto-backup/Song.bwproject");
    touch(root, "Bounces/final.wav");
}

fn raw_titles(store: &SqliteCatalog) -> Vec<String> {
    let mut titles: Vec<String> = store
        .list_by_stage(Stage::Raw, &ListFilter::default(), Page::all())
        .unwrap()
        .into_iter()
        .map(|entry| entry.title().to_string())
        .collect();
    titles.sort();
    titles
}

#[test]
fn test_discovers_one_entry_per_project() {
    let temp_dir = TempDir::new().unwrap();
    create_library(temp_dir.path());
    let mut store = SqliteCatalog::open_in_memory().unwrap();

    let report = discover(&mut store, temp_dir.path(), &WalkOptions::default()).unwrap();

    assert_eq!(report.inserted, 5);
    assert_eq!(report.duplicates, 0);
    assert_eq!(report.errors, 0);
    assert_eq!(
        raw_titles(&store),
        vec!["Hymn", "Night Drive", "Song A", "Song B", "Track1"]
    );
}

#[test]
fn test_second_run_is_all_duplicates() {
    let temp_dir = TempDir::new().unwrap();
    create_library(temp_dir.path());
    let db_dir = TempDir::new().unwrap();
    let db_path = db_dir.path().join("music_tracker.db");

    let first = {
        let mut store = SqliteCatalog::open(&db_path).unwrap();
        discover(&mut store, temp_dir.path(), &WalkOptions::default()).unwrap()
    };
    let mut store = SqliteCatalog::open(&db_path).unwrap();
    let second = discover(&mut store, temp_dir.path(), &WalkOptions::default()).unwrap();

    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, first.inserted);
    assert_eq!(store.stats().unwrap().raw, first.inserted);
}

#[test]
fn test_versioned_sibling_is_never_cataloged() {
    let temp_dir = TempDir::new().unwrap();
    create_library(temp_dir.path());
    let mut store = SqliteCatalog::open_in_memory().unwrap();
    discover(&mut store, temp_dir.path(), &WalkOptions::default()).unwrap();

    let matches = store.find_by_title("Night Drive").unwrap();
    assert_eq!(matches.len(), 1);
    let entry = &matches[0];
    assert_eq!(entry.tool_family(), ToolFamily::Bitwig);
    assert!(entry.artifact.path.ends_with("Night Drive/Song.bwproject"));
    assert!(store
        .all_entries()
        .unwrap()
        .iter()
        .all(|e| !e.artifact.path.to_string_lossy().contains("2024-05-25")));
}

#[test]
fn test_nothing_beneath_backup_folders_is_touched() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(root, "Loop/Loop.bwproject");
    for i in 0..20 {
        touch(root, &format!("Loop/auto-backup/snap{}/Loop.bwproject", i));
    }

    let mut walker = ProjectWalker::new(root, &WalkOptions::default()).unwrap();
    let found: Vec<_> = walker.by_ref().filter_map(|r| r.ok()).collect();
    let stats = walker.stats();

    assert_eq!(found.len(), 1);
    assert_eq!(stats.pruned_dirs, 1);
    // Loop, Loop/Loop.bwproject, Loop/auto-backup
    assert_eq!(stats.entries_inspected, 3);
}

#[test]
fn test_logic_title_rules() {
    let temp_dir = TempDir::new().unwrap();
    create_library(temp_dir.path());
    let mut store = SqliteCatalog::open_in_memory().unwrap();
    discover(&mut store, temp_dir.path(), &WalkOptions::default()).unwrap();

    let song_a = store.find_by_title("Song A").unwrap().remove(0);
    assert!(song_a.artifact.folder_path.is_some());
    assert!(song_a.artifact.path.ends_with("Song A/Song A.logicx"));

    let song_b = store.find_by_title("Song B").unwrap().remove(0);
    assert!(song_b.artifact.folder_path.is_none());
}

#[test]
fn test_same_title_from_two_daws_is_a_duplicate() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(root, "a/Anthem/Anthem.song");
    touch(root, "b/Anthem.flp");
    let mut store = SqliteCatalog::open_in_memory().unwrap();

    let report = discover(&mut store, root, &WalkOptions::default()).unwrap();
    assert_eq!(report.inserted, 1);
    assert_eq!(report.duplicates, 1);
    // Walk order decides: a/ comes before b/
    let entry = store.find_by_title("Anthem").unwrap().remove(0);
    assert_eq!(entry.tool_family(), ToolFamily::StudioOne);
}

#[cfg(unix)]
#[test]
fn test_symlink_cycle_terminates() {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(root, "projects/Track1.flp");
    symlink(root, root.join("projects/up")).unwrap();

    let options = WalkOptions {
        follow_symlinks: true,
        ..Default::default()
    };
    let mut store = SqliteCatalog::open_in_memory().unwrap();
    let report = discover(&mut store, root, &options).unwrap();
    assert_eq!(report.inserted, 1);
    assert!(report.walk.cycles_refused >= 1);
}

#[cfg(unix)]
#[test]
fn test_unreadable_entry_is_counted_and_walk_continues() {
    use std::os::unix::fs::symlink;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(root, "a/Beat.flp");
    symlink(root.join("a/nowhere"), root.join("a/dead")).unwrap();

    let options = WalkOptions {
        follow_symlinks: true,
        ..Default::default()
    };
    let mut store = SqliteCatalog::open_in_memory().unwrap();
    let report = discover(&mut store, root, &options).unwrap();

    assert_eq!(report.inserted, 1);
    assert_eq!(report.errors, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].contains("dead"));
    assert_eq!(store.find_by_title("Beat").unwrap().len(), 1);
}

// Linux filesystems accept arbitrary bytes in names
#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_project_names_are_cataloged() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    let beats = root.join("beats");
    fs::create_dir_all(&beats).unwrap();
    fs::write(beats.join(OsStr::from_bytes(b"Caf\xe9 Beat.flp")), b"flp").unwrap();
    fs::write(beats.join("Track1.flp"), b"flp").unwrap();

    let mut store = SqliteCatalog::open_in_memory().unwrap();
    let report = discover(&mut store, root, &WalkOptions::default()).unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.errors, 0);
    assert_eq!(report.walk.irrelevant, 0);
    assert_eq!(store.find_by_title("Beat").unwrap().len(), 1);
}

#[test]
fn test_whitespace_distinguishes_titles() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    touch(root, "a/Beat.flp");
    touch(root, "b/Beat .flp");

    let mut store = SqliteCatalog::open_in_memory().unwrap();
    let report = discover(&mut store, root, &WalkOptions::default()).unwrap();

    assert_eq!(report.inserted, 2);
    assert_eq!(report.duplicates, 0);
    assert_eq!(raw_titles(&store), vec!["Beat", "Beat "]);
}

#[test]
fn test_unreadable_root_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let file_root = touch(temp_dir.path(), "not-a-dir.flp");
    let mut store = SqliteCatalog::open_in_memory().unwrap();

    assert!(discover(&mut store, &file_root, &WalkOptions::default()).is_err());
    assert_eq!(store.stats().unwrap().total(), 0);
}
