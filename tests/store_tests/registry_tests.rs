//! Tests for DbStore
//!
//! These tests verify:
//! - Create/drop/connect/mount/unmount/list
//! - Path-like database names
//! - Manifest persistence and reload
//! - Default database creation on first start

use std::collections::HashSet;
use std::fs;

use elevator::config::{CoreConfig, EngineOptions};
use elevator::protocol::DbTarget;
use elevator::store::{is_file_path, DbOperation, DbStore, MountStatus};
use elevator::ElevatorError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn core_config(temp_dir: &TempDir) -> CoreConfig {
    CoreConfig {
        store_path: temp_dir.path().join("store.json"),
        storage_path: temp_dir.path().join("data"),
        default_db: "default".to_string(),
    }
}

fn options() -> EngineOptions {
    EngineOptions {
        cache_size: 4 * 1024 * 1024,
        ..EngineOptions::default()
    }
}

fn setup_store() -> (TempDir, DbStore) {
    let temp_dir = TempDir::new().unwrap();
    let store = DbStore::new(core_config(&temp_dir), options());
    (temp_dir, store)
}

fn names(store: &DbStore) -> HashSet<String> {
    store.list().into_iter().collect()
}

// =============================================================================
// Create / Drop Tests
// =============================================================================

#[test]
fn test_create_registers_and_mounts() {
    let (temp_dir, store) = setup_store();

    let uid = store.create("test_db").unwrap();

    assert_eq!(store.connect("test_db").unwrap(), uid);
    assert_eq!(store.status("test_db").unwrap(), MountStatus::Mounted);
    assert!(store.exists("test_db"));
    assert!(temp_dir.path().join("data").join("test_db").is_dir());
    assert!(temp_dir.path().join("store.json").exists());
}

#[test]
fn test_create_duplicate_fails() {
    let (_temp, store) = setup_store();
    store.create("test_db").unwrap();

    let err = store.create("test_db").unwrap_err();

    assert!(matches!(err, ElevatorError::DatabaseExists(_)));
    assert_eq!(store.len(), 1);
}

#[test]
fn test_create_empty_name_fails() {
    let (_temp, store) = setup_store();

    assert!(matches!(
        store.create("  ").unwrap_err(),
        ElevatorError::Request(_)
    ));
    assert!(store.is_empty());
}

#[test]
fn test_create_absolute_path() {
    let (temp_dir, store) = setup_store();
    let path = temp_dir.path().join("elsewhere");
    let name = path.to_str().unwrap();

    store.create(name).unwrap();

    assert!(path.is_dir());
    assert_eq!(store.status(name).unwrap(), MountStatus::Mounted);
}

#[test]
fn test_create_relative_path_fails() {
    let (_temp, store) = setup_store();

    for name in ["./relative", "some/relative", ".hidden"] {
        let err = store.create(name).unwrap_err();
        assert!(
            matches!(err, ElevatorError::RelativePathNotAllowed(_)),
            "{} gave {:?}",
            name,
            err
        );
    }
    assert!(store.is_empty());
}

#[test]
fn test_create_path_with_missing_parent_fails() {
    let (temp_dir, store) = setup_store();
    let path = temp_dir.path().join("missing").join("db");

    let err = store.create(path.to_str().unwrap()).unwrap_err();

    assert!(matches!(err, ElevatorError::NoSuchPath(_)));
}

#[test]
fn test_is_file_path() {
    assert!(is_file_path("/abs/db"));
    assert!(is_file_path("rel/db"));
    assert!(is_file_path(".db"));
    assert!(!is_file_path("plain_name"));
}

#[test]
fn test_drop_removes_everything() {
    let (temp_dir, store) = setup_store();
    let uid = store.create("test_db").unwrap();

    store.drop_db("test_db").unwrap();

    assert!(matches!(
        store.connect("test_db").unwrap_err(),
        ElevatorError::NoSuchDatabase(_)
    ));
    assert!(matches!(
        store.queue_for(&DbTarget::Uid(uid)).unwrap_err(),
        ElevatorError::NoSuchDatabaseUid(_)
    ));
    assert!(matches!(
        store
            .queue_for(&DbTarget::Name("test_db".to_string()))
            .unwrap_err(),
        ElevatorError::NoSuchDatabase(_)
    ));
    assert!(!temp_dir.path().join("data").join("test_db").exists());
    assert!(!store.exists("test_db"));
}

#[test]
fn test_drop_unmounted_database() {
    let (_temp, store) = setup_store();
    let uid = store.create("test_db").unwrap();
    store.unmount(&uid).unwrap();

    store.drop_db("test_db").unwrap();

    assert!(store.is_empty());
}

#[test]
fn test_drop_unknown_fails() {
    let (_temp, store) = setup_store();

    assert!(matches!(
        store.drop_db("nope").unwrap_err(),
        ElevatorError::NoSuchDatabase(_)
    ));
}

#[test]
fn test_drop_with_missing_storage_directory() {
    let (temp_dir, store) = setup_store();
    let uid = store.create("test_db").unwrap();
    store.unmount(&uid).unwrap();
    fs::remove_dir_all(temp_dir.path().join("data").join("test_db")).unwrap();

    store.drop_db("test_db").unwrap();

    assert!(store.is_empty());
}

// =============================================================================
// Mount / Unmount Tests
// =============================================================================

#[test]
fn test_mount_unmount_by_uid() {
    let (_temp, store) = setup_store();
    let uid = store.create("test_db").unwrap();

    store.unmount(&uid).unwrap();
    assert_eq!(store.status("test_db").unwrap(), MountStatus::Unmounted);
    assert!(matches!(
        store.unmount(&uid).unwrap_err(),
        ElevatorError::AlreadyUnmounted(_)
    ));

    store.mount(&uid).unwrap();
    assert_eq!(store.status("test_db").unwrap(), MountStatus::Mounted);
    assert!(matches!(
        store.mount(&uid).unwrap_err(),
        ElevatorError::AlreadyMounted(_)
    ));
}

#[test]
fn test_mount_unknown_uid() {
    let (_temp, store) = setup_store();

    assert!(matches!(
        store.mount("no-such-uid").unwrap_err(),
        ElevatorError::NoSuchDatabaseUid(_)
    ));
}

#[test]
fn test_queue_for_mounts_on_demand() {
    let (_temp, store) = setup_store();
    let uid = store.create("test_db").unwrap();
    store.unmount(&uid).unwrap();

    let queue = store.queue_for(&DbTarget::Name("test_db".to_string())).unwrap();
    queue
        .call(DbOperation::Put {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        })
        .unwrap();

    assert_eq!(store.status("test_db").unwrap(), MountStatus::Mounted);
    let values = store
        .queue_for(&DbTarget::Uid(uid))
        .unwrap()
        .call(DbOperation::Get { key: b"k".to_vec() })
        .unwrap();
    assert_eq!(values, vec![b"v".to_vec()]);
}

#[test]
fn test_unmount_all() {
    let (_temp, store) = setup_store();
    store.create("a").unwrap();
    let uid_b = store.create("b").unwrap();
    store.unmount(&uid_b).unwrap();

    store.unmount_all();

    assert_eq!(store.status("a").unwrap(), MountStatus::Unmounted);
    assert_eq!(store.status("b").unwrap(), MountStatus::Unmounted);
}

// =============================================================================
// List Tests
// =============================================================================

#[test]
fn test_list() {
    let (_temp, store) = setup_store();
    assert!(store.list().is_empty());

    store.create("a").unwrap();
    store.create("b").unwrap();
    store.create("c").unwrap();
    store.drop_db("b").unwrap();

    let expected: HashSet<String> = ["a", "c"].iter().map(|s| s.to_string()).collect();
    assert_eq!(names(&store), expected);
}

// =============================================================================
// Manifest Tests
// =============================================================================

#[test]
fn test_manifest_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let index = {
        let store = DbStore::new(core_config(&temp_dir), options());
        store.create("a").unwrap();
        store.create("b").unwrap();
        store.write_to_file().unwrap();
        store.unmount_all();
        store.index()
    };

    let reloaded = DbStore::new(core_config(&temp_dir), options());
    reloaded.load().unwrap();

    assert_eq!(reloaded.index(), index);
    assert_eq!(reloaded.status("a").unwrap(), MountStatus::Unmounted);
}

#[test]
fn test_manifest_is_json() {
    let (temp_dir, store) = setup_store();
    let uid = store.create("test_db").unwrap();

    let content = fs::read_to_string(temp_dir.path().join("store.json")).unwrap();
    let manifest: serde_json::Value = serde_json::from_str(&content).unwrap();

    assert_eq!(manifest[&uid]["name"], "test_db");
    assert_eq!(manifest[&uid]["uid"], uid.as_str());
}

#[test]
fn test_manifest_write_requires_directory() {
    let temp_dir = TempDir::new().unwrap();
    let config = CoreConfig {
        store_path: temp_dir.path().join("missing").join("store.json"),
        ..core_config(&temp_dir)
    };
    let store = DbStore::new(config, options());

    assert!(matches!(
        store.write_to_file().unwrap_err(),
        ElevatorError::NoSuchPath(_)
    ));
}

#[test]
fn test_initialize_creates_default_database() {
    let temp_dir = TempDir::new().unwrap();

    let store = DbStore::initialize(core_config(&temp_dir), options()).unwrap();

    assert_eq!(store.list(), vec!["default".to_string()]);
    assert_eq!(store.status("default").unwrap(), MountStatus::Mounted);
}

#[test]
fn test_initialize_loads_existing_manifest() {
    let temp_dir = TempDir::new().unwrap();
    let uid = {
        let store = DbStore::initialize(core_config(&temp_dir), options()).unwrap();
        let uid = store.create("extra").unwrap();
        store.unmount_all();
        uid
    };

    let store = DbStore::initialize(core_config(&temp_dir), options()).unwrap();

    assert_eq!(store.len(), 2);
    assert_eq!(store.connect("extra").unwrap(), uid);
}

#[test]
fn test_initialize_with_corrupt_manifest() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("store.json"), b"{ not json").unwrap();

    let store = DbStore::initialize(core_config(&temp_dir), options()).unwrap();

    assert_eq!(store.list(), vec!["default".to_string()]);
}

#[test]
fn test_load_keys_handles_by_uid() {
    let (temp_dir, store) = setup_store();
    let manifest = serde_json::json!({
        "k1": {
            "name": "a",
            "uid": "other",
            "path": temp_dir.path().join("data").join("a"),
        }
    });
    fs::write(
        temp_dir.path().join("store.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();

    store.load().unwrap();

    assert_eq!(store.connect("a").unwrap(), "other");
    assert_eq!(store.status("a").unwrap(), MountStatus::Unmounted);
    assert!(!store.exists("a"));
    store.mount("other").unwrap();
    assert_eq!(store.status("a").unwrap(), MountStatus::Mounted);
}

#[test]
fn test_load_rejects_duplicate_names() {
    let (temp_dir, store) = setup_store();
    let manifest = serde_json::json!({
        "u1": { "name": "a", "uid": "u1", "path": temp_dir.path().join("data").join("a1") },
        "u2": { "name": "a", "uid": "u2", "path": temp_dir.path().join("data").join("a2") },
    });
    fs::write(
        temp_dir.path().join("store.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();

    assert!(store.load().is_err());
    assert!(store.list().is_empty());
}

#[test]
fn test_load_rejects_duplicate_uids() {
    let (temp_dir, store) = setup_store();
    let manifest = serde_json::json!({
        "k1": { "name": "a", "uid": "same", "path": temp_dir.path().join("data").join("a") },
        "k2": { "name": "b", "uid": "same", "path": temp_dir.path().join("data").join("b") },
    });
    fs::write(
        temp_dir.path().join("store.json"),
        serde_json::to_vec(&manifest).unwrap(),
    )
    .unwrap();

    assert!(store.load().is_err());
    assert!(store.list().is_empty());
}

#[test]
fn test_create_mount_failure_stays_registered() {
    let (temp_dir, store) = setup_store();
    let blocker = temp_dir.path().join("data").join("blocked");
    fs::create_dir_all(blocker.parent().unwrap()).unwrap();
    fs::write(&blocker, b"not a database directory").unwrap();

    assert!(store.create("blocked").is_err());

    assert_eq!(store.list(), vec!["blocked".to_string()]);
    assert_eq!(store.status("blocked").unwrap(), MountStatus::Unmounted);

    // The next request mounts it once the path is usable
    fs::remove_file(&blocker).unwrap();
    let queue = store
        .queue_for(&DbTarget::Name("blocked".to_string()))
        .unwrap();
    queue
        .call(DbOperation::Put {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        })
        .unwrap();
    assert_eq!(store.status("blocked").unwrap(), MountStatus::Mounted);
}
