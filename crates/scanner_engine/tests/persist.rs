use std::fs;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use scanner_engine::{ensure_output_dir, AtomicFileWriter, Checkpoint, CheckpointStore, PersistError};
use tempfile::TempDir;

#[test]
fn creates_missing_output_dir() {
    let temp = TempDir::new().unwrap();
    let new_dir = temp.path().join("state");
    assert!(!new_dir.exists());
    ensure_output_dir(&new_dir).unwrap();
    assert!(new_dir.is_dir());
}

#[test]
fn atomic_write_replaces_existing_file() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("cursor.ron", "one").unwrap();
    assert_eq!(fs::read_to_string(&first).unwrap(), "one");

    let second = writer.write("cursor.ron", "two").unwrap();
    assert_eq!(first, second);
    assert_eq!(fs::read_to_string(&second).unwrap(), "two");
}

#[test]
fn no_partial_file_on_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("not_a_dir");
    fs::write(&file_path, "x").unwrap();

    let writer = AtomicFileWriter::new(file_path.clone());
    assert!(writer.write("cursor.ron", "data").is_err());
    assert!(!file_path.with_file_name("cursor.ron").exists());
}

#[test]
fn missing_checkpoint_loads_as_none() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("alice.ron")).unwrap();
    assert_eq!(store.load().unwrap(), None);
}

#[test]
fn checkpoint_survives_save_and_load() {
    let temp = TempDir::new().unwrap();
    let store = CheckpointStore::new(temp.path().join("nested").join("alice.ron")).unwrap();
    let checkpoint = Checkpoint {
        platform: "savee".to_string(),
        profile_ref: "alice".to_string(),
        next_index: 118,
        consecutive_failures: 6,
        hits: 12,
        hit_day: NaiveDate::from_ymd_opt(2026, 3, 14),
        hits_today: 4,
    };

    store.save(&checkpoint).unwrap();
    assert_eq!(store.load().unwrap(), Some(checkpoint));
}

#[test]
fn corrupt_checkpoint_is_a_parse_error() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("alice.ron");
    fs::write(&path, "(next_index: ").unwrap();

    let store = CheckpointStore::new(&path).unwrap();
    assert!(matches!(store.load(), Err(PersistError::Parse { .. })));
}

#[test]
fn checkpoint_path_needs_a_file_name() {
    assert!(matches!(
        CheckpointStore::new("/"),
        Err(PersistError::InvalidPath(_))
    ));
}

#[test]
fn checkpoint_produces_resume_request() {
    let mut checkpoint = Checkpoint::new("Cosmos", "bob", 40);
    checkpoint.consecutive_failures = 3;
    assert!(checkpoint.matches("cosmos", "bob"));
    assert!(!checkpoint.matches("cosmos", "alice"));

    let request = checkpoint.to_request();
    assert_eq!(request.profile_ref, "bob");
    assert_eq!(request.next_index, 40);
    assert_eq!(request.consecutive_failures, 3);
    assert_eq!(request.max_failures, None);
}

#[test]
fn daily_hit_count_restarts_on_a_new_day() {
    let monday = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
    let tuesday = monday.succ_opt().unwrap();
    let mut checkpoint = Checkpoint::new("savee", "alice", 0);
    checkpoint.hit_day = Some(monday);
    checkpoint.hits_today = 7;
    checkpoint.hits = 30;

    assert_eq!(checkpoint.hits_on(monday), 7);
    assert_eq!(checkpoint.hits_on(tuesday), 0);
}

#[test]
fn checkpoint_without_daily_fields_still_loads() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("old.ron");
    fs::write(
        &path,
        r#"(platform: "savee", profile_ref: "alice", next_index: 9, consecutive_failures: 1, hits: 2)"#,
    )
    .unwrap();

    let loaded = CheckpointStore::new(&path).unwrap().load().unwrap().unwrap();
    assert_eq!(loaded.next_index, 9);
    assert_eq!(loaded.hit_day, None);
    assert_eq!(loaded.hits_today, 0);
}
