//! Tests for the directory-tree storage backend

use pretty_assertions::assert_eq;
use std::fs;
use strata_store::{BackendConfig, Error, FileParams, FileStorage, Storage, open};
use tempfile::TempDir;

fn setup() -> (TempDir, FileStorage) {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let storage = FileStorage::open(&FileParams::new(temp.path())).unwrap();
    (temp, storage)
}

#[test]
fn test_set_writes_value_file_under_key_directory() {
    let (temp, mut storage) = setup();

    assert!(storage.set("rc:app:prod", "db:\n  port: 5432\n").unwrap());

    let file = temp.path().join("rc/app/prod/prod.yaml");
    assert!(file.is_file());
    assert_eq!(fs::read_to_string(file).unwrap(), "db:\n  port: 5432\n");
}

#[test]
fn test_get_round_trips_value() {
    let (_temp, mut storage) = setup();
    storage.set("rc:app", "name: demo\n").unwrap();

    assert_eq!(storage.get("rc:app").unwrap().as_deref(), Some("name: demo\n"));
    assert_eq!(storage.get("rc:missing").unwrap(), None);
}

#[test]
fn test_get_concatenates_all_value_files_in_directory() {
    let (temp, mut storage) = setup();
    let dir = temp.path().join("rc/app");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("a.yaml"), "a: 1").unwrap();
    fs::write(dir.join("b.yaml"), "b: 2").unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    assert_eq!(storage.get("rc:app").unwrap().as_deref(), Some("a: 1\nb: 2"));
}

#[test]
fn test_excluded_stems_are_not_read() {
    let temp = TempDir::new().unwrap();
    let mut params = FileParams::new(temp.path());
    params.exclude = vec!["secret".to_string()];
    let mut storage = FileStorage::open(&params).unwrap();

    let dir = temp.path().join("rc/app");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("app.yaml"), "a: 1").unwrap();
    fs::write(dir.join("secret.yaml"), "token: x").unwrap();

    assert_eq!(storage.get("rc:app").unwrap().as_deref(), Some("a: 1"));
}

#[test]
fn test_keys_walks_tree_and_filters_by_pattern() {
    let (_temp, mut storage) = setup();
    storage.set("rc:app", "a: 1").unwrap();
    storage.set("rc:app:prod", "a: 2").unwrap();
    storage.set("rc:db", "a: 3").unwrap();

    assert_eq!(
        storage.keys("rc:app*").unwrap(),
        vec!["rc:app".to_string(), "rc:app:prod".to_string()]
    );
    assert_eq!(storage.keys("rc:*").unwrap().len(), 3);
}

#[test]
fn test_get_many_with_exclude() {
    let (_temp, mut storage) = setup();
    storage.set("rc:app", "a: 1").unwrap();
    storage.set("rc:app:prod", "a: 2").unwrap();

    let found = storage.get_many("rc:*", Some("rc:app:prod")).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found["rc:app"], "a: 1");
}

#[test]
fn test_delete_removes_files_and_prunes_empty_directories() {
    let (temp, mut storage) = setup();
    storage.set("rc:app:prod", "a: 2").unwrap();

    let deleted = storage.delete("rc:app:prod").unwrap();

    assert_eq!(deleted, vec!["rc:app:prod".to_string()]);
    assert!(!temp.path().join("rc").exists());
    assert_eq!(storage.get("rc:app:prod").unwrap(), None);
}

#[test]
fn test_delete_keeps_parent_with_own_value() {
    let (temp, mut storage) = setup();
    storage.set("rc:app", "a: 1").unwrap();
    storage.set("rc:app:prod", "a: 2").unwrap();

    storage.delete("rc:app:prod").unwrap();

    assert!(temp.path().join("rc/app/app.yaml").is_file());
    assert_eq!(storage.keys("rc:*").unwrap(), vec!["rc:app".to_string()]);
}

#[test]
fn test_attributed_keys_are_rejected() {
    let (_temp, mut storage) = setup();
    assert!(!storage.supports_attributes());

    let err = storage.set("rc:app#rev=1", "a: 1").unwrap_err();
    assert!(matches!(err, Error::MalformedKey { .. }));
}

#[test]
fn test_traversal_segments_are_rejected() {
    let (_temp, mut storage) = setup();
    assert!(storage.set("rc:..:etc", "x").is_err());
    assert!(storage.set("rc::app", "x").is_err());
}

#[test]
fn test_open_rejects_file_as_root() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("plain.txt");
    fs::write(&file, "x").unwrap();

    let err = open(&BackendConfig::File(FileParams::new(&file)))
        .err()
        .expect("a plain file cannot be a storage root");
    assert!(matches!(err, Error::InvalidBackend { .. }));
}

#[test]
fn test_failed_write_leaves_no_partial_file() {
    let (temp, mut storage) = setup();
    let dir = temp.path().join("rc/app");
    // A non-empty directory where the value file belongs makes the rename fail
    fs::create_dir_all(dir.join("app.yaml")).unwrap();
    fs::write(dir.join("app.yaml/keep.txt"), "x").unwrap();

    assert!(matches!(storage.set("rc:app", "a: 1"), Err(Error::Io { .. })));

    let names: Vec<String> = fs::read_dir(&dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["app.yaml".to_string()]);
}
