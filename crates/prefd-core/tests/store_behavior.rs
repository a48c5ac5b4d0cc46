//! Integration tests for the configuration store's observable behaviour.
//!
//! These tests exercise `ConfigStore` through its public API the way the
//! daemon's exposition layer uses it: typed get/set round-trips, rejection
//! paths that must not mutate state, rollback on persistence failure, the
//! drain semantics of the change queue, and drift detection against a user
//! file edited out-of-band.
//!
//! External edits are simulated by rewriting the user file directly. A short
//! sleep separates writes so the file's modification timestamp is guaranteed
//! to move even on filesystems with coarse timestamp resolution.

use std::fs;
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

use prefd_core::{ConfigPath, ConfigStore, ConfigValue, SetStatus};

const TEMPLATE: &str = r#"{
    "video": {
        "dpi": {
            "default": 96,
            "displayed_name": "Display DPI",
            "description": "Dots per inch reported to clients"
        },
        "modes": {
            "default": ["1920x1080"],
            "displayed_name": "Preferred modes",
            "description": "Mode list in priority order"
        }
    },
    "general": {
        "mirroring": {
            "default": false,
            "displayed_name": "Mirroring",
            "description": "Mirror all outputs"
        }
    }
}"#;

/// Separates two writes to the same file far enough apart that the second
/// one observably moves the modification timestamp.
const MTIME_GAP: Duration = Duration::from_millis(30);

fn scratch() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let template = dir.path().join("template.json");
    let user = dir.path().join("settings.json");
    fs::write(&template, TEMPLATE).expect("write template");
    (dir, template, user)
}

fn dpi() -> ConfigPath {
    ConfigPath::new("video", "dpi").unwrap()
}

fn mirroring() -> ConfigPath {
    ConfigPath::new("general", "mirroring").unwrap()
}

// ── Round-trip and rejection paths ────────────────────────────────────────────

#[test]
fn test_set_then_get_round_trips() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");

    // Act
    let status = store.set(&dpi(), ConfigValue::Int(120));

    // Assert
    assert_eq!(status, SetStatus::Ok);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(120)));
}

#[test]
fn test_set_unknown_path_returns_not_found_and_does_not_mutate() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, &user).expect("open");
    let missing = ConfigPath::new("missing", "path").unwrap();

    // Act
    let status = store.set(&missing, ConfigValue::Int(1));

    // Assert – status, no user file written, no change signalled
    assert_eq!(status, SetStatus::NotFound);
    assert!(!user.exists());
    assert!(!store.was_updated());
    assert!(store.updated_paths().is_empty());
}

#[test]
fn test_set_mismatched_type_returns_type_mismatch_and_does_not_mutate() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");
    assert_eq!(store.set(&dpi(), ConfigValue::Int(120)), SetStatus::Ok);
    store.was_updated();
    store.updated_paths();

    // Act – "high" is a String, dpi is Int
    let status = store.set(&dpi(), ConfigValue::String("high".to_owned()));

    // Assert – prior value still observable, nothing new queued
    assert_eq!(status, SetStatus::TypeMismatch);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(120)));
    assert!(!store.was_updated());
}

#[test]
fn test_set_float_literal_does_not_match_int_setting() {
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");

    let status = store.set(&dpi(), ConfigValue::Float(96.0));
    assert_eq!(status, SetStatus::TypeMismatch);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(96)));
}

#[test]
fn test_set_array_setting_round_trips() {
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");
    let modes = ConfigPath::new("video", "modes").unwrap();

    let value = ConfigValue::ArrayString(vec!["2560x1440".to_owned(), "1920x1080".to_owned()]);
    assert_eq!(store.set(&modes, value.clone()), SetStatus::Ok);
    assert_eq!(store.get(&modes), Some(value));
}

// ── Persistence failure and rollback ──────────────────────────────────────────

#[test]
fn test_failed_persist_rolls_back_new_override() {
    // Arrange – user path's parent is a regular file, so the write must fail
    let (_dir, template, _user) = scratch();
    let blocker = _dir.path().join("blocker");
    fs::write(&blocker, "i am a file").unwrap();
    let user = blocker.join("settings.json");
    let mut store = ConfigStore::open(&template, user).expect("open");

    // Act
    let status = store.set(&dpi(), ConfigValue::Int(120));

    // Assert – the staged value was rolled back, default still served,
    // and no change was recorded
    assert_eq!(status, SetStatus::FileError);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(96)));
    assert!(!store.was_updated());
    assert!(store.updated_paths().is_empty());
}

#[test]
fn test_failed_persist_restores_previous_override() {
    // Arrange – the first set succeeds into dir/sub/settings.json
    let (_dir, template, _user) = scratch();
    let sub = _dir.path().join("sub");
    let user = sub.join("settings.json");
    let mut store = ConfigStore::open(&template, &user).expect("open");
    assert_eq!(store.set(&dpi(), ConfigValue::Int(120)), SetStatus::Ok);
    store.was_updated();
    store.updated_paths();

    // Replace the parent directory with a regular file so the next persist
    // cannot create the temp file. The user file itself is gone, which the
    // drift check deliberately ignores.
    fs::remove_dir_all(&sub).unwrap();
    fs::write(&sub, "i am a file").unwrap();

    // Act
    let status = store.set(&dpi(), ConfigValue::Int(150));

    // Assert – the previous override was restored, not the default
    assert_eq!(status, SetStatus::FileError);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(120)));
    assert!(!store.was_updated());
    assert!(store.updated_paths().is_empty());
}

// ── Change queue drain semantics ──────────────────────────────────────────────

#[test]
fn test_updated_paths_drains_exactly_once() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");
    assert_eq!(store.set(&dpi(), ConfigValue::Int(120)), SetStatus::Ok);
    assert_eq!(store.set(&mirroring(), ConfigValue::Bool(true)), SetStatus::Ok);

    // Act
    let first = store.updated_paths();
    let second = store.updated_paths();

    // Assert
    assert_eq!(first, vec![dpi(), mirroring()]);
    assert!(second.is_empty());
}

#[test]
fn test_was_updated_drains_independently_of_updated_paths() {
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");
    assert_eq!(store.set(&dpi(), ConfigValue::Int(120)), SetStatus::Ok);

    assert!(store.was_updated());
    assert!(!store.was_updated());
    // The path queue has its own drain cycle.
    assert_eq!(store.updated_paths(), vec![dpi()]);
}

#[test]
fn test_own_write_is_not_misread_as_external_edit() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, user).expect("open");
    assert_eq!(store.set(&dpi(), ConfigValue::Int(120)), SetStatus::Ok);

    // Drain the change produced by the set itself.
    assert!(store.was_updated());
    store.updated_paths();

    // Act / Assert – the store's own persisted write must not re-trigger
    sleep(MTIME_GAP);
    assert!(!store.was_updated());
    assert!(store.updated_paths().is_empty());
}

// ── External edits (drift) ────────────────────────────────────────────────────

#[test]
fn test_external_edit_is_observed_on_next_call() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, &user).expect("open");
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(96)));

    // Act – the user's editor writes a new override out-of-band
    sleep(MTIME_GAP);
    fs::write(&user, r#"{"video": {"dpi": 144}}"#).unwrap();

    // Assert
    assert!(store.was_updated());
    assert_eq!(store.updated_paths(), vec![dpi()]);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(144)));
}

#[test]
fn test_external_edit_to_fresh_file_is_observed() {
    // Arrange – no user file at startup
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, &user).expect("open");

    // Act – the file appears after the daemon started
    fs::write(&user, r#"{"general": {"mirroring": true}}"#).unwrap();

    // Assert – observed through get as well
    assert_eq!(store.get(&mirroring()), Some(ConfigValue::Bool(true)));
    assert!(store.was_updated());
}

#[test]
fn test_external_edit_with_same_value_is_not_a_change() {
    // Arrange
    let (_dir, template, user) = scratch();
    fs::write(&user, r#"{"video": {"dpi": 144}}"#).unwrap();
    let mut store = ConfigStore::open(&template, &user).expect("open");

    // Act – rewrite the file with identical content; mtime moves, value not
    sleep(MTIME_GAP);
    fs::write(&user, r#"{"video": {"dpi": 144}}"#).unwrap();

    // Assert
    assert!(!store.was_updated());
    assert!(store.updated_paths().is_empty());
}

#[test]
fn test_deleting_user_file_does_not_revert_overrides() {
    // Arrange
    let (_dir, template, user) = scratch();
    fs::write(&user, r#"{"video": {"dpi": 144}}"#).unwrap();
    let mut store = ConfigStore::open(&template, &user).expect("open");
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(144)));

    // Act
    fs::remove_file(&user).unwrap();

    // Assert – a deleted file is not "all settings reverted"
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(144)));
    assert!(!store.was_updated());
}

#[test]
fn test_deleting_one_key_externally_does_not_revert_it() {
    // Arrange – two overrides on disk
    let (_dir, template, user) = scratch();
    fs::write(
        &user,
        r#"{"video": {"dpi": 144}, "general": {"mirroring": true}}"#,
    )
    .unwrap();
    let mut store = ConfigStore::open(&template, &user).expect("open");

    // Act – the dpi key is removed from the file out-of-band
    sleep(MTIME_GAP);
    fs::write(&user, r#"{"general": {"mirroring": true}}"#).unwrap();

    // Assert – the merge is additive-only: dpi keeps its override
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(144)));
    assert!(!store.was_updated());
}

#[test]
fn test_external_edit_with_invalid_entries_keeps_valid_ones() {
    // Arrange
    let (_dir, template, user) = scratch();
    let mut store = ConfigStore::open(&template, &user).expect("open");

    // Act – one valid entry, one unknown, one mistyped
    sleep(MTIME_GAP);
    fs::write(
        &user,
        r#"{
            "video": {"dpi": 150, "unknown": 1},
            "general": {"mirroring": "yes"}
        }"#,
    )
    .unwrap();

    // Assert
    assert!(store.was_updated());
    assert_eq!(store.updated_paths(), vec![dpi()]);
    assert_eq!(store.get(&dpi()), Some(ConfigValue::Int(150)));
    assert_eq!(store.get(&mirroring()), Some(ConfigValue::Bool(false)));
}
