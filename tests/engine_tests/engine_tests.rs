//! Tests for Engine
//!
//! These tests verify:
//! - Basic get/put/delete operations
//! - Snapshot reads (range, scan)
//! - Atomic batch writes
//! - Engine lifecycle (open/close/reopen)

use elevator::config::EngineOptions;
use elevator::engine::Engine;
use elevator::store::BatchOperation;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn test_options() -> EngineOptions {
    EngineOptions {
        cache_size: 4 * 1024 * 1024,
        ..EngineOptions::default()
    }
}

fn setup_temp_engine() -> (TempDir, Engine) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(&temp_dir.path().join("db"), &test_options()).unwrap();
    (temp_dir, engine)
}

fn fill(engine: &Engine, keys: &[&str]) {
    for key in keys {
        engine
            .put(key.as_bytes(), format!("v_{}", key).as_bytes())
            .unwrap();
    }
}

fn keys_of(pairs: &[(Vec<u8>, Vec<u8>)]) -> Vec<String> {
    pairs
        .iter()
        .map(|(k, _)| String::from_utf8(k.clone()).unwrap())
        .collect()
}

// =============================================================================
// Basic Operations Tests
// =============================================================================

#[test]
fn test_engine_open_creates_directories() {
    let temp_dir = TempDir::new().unwrap();
    let db_dir = temp_dir.path().join("nested").join("mydb");

    let engine = Engine::open(&db_dir, &test_options()).unwrap();

    assert!(db_dir.exists());
    assert!(db_dir.join("data.redb").exists());
    assert_eq!(engine.path(), db_dir.as_path());
}

#[test]
fn test_engine_put_get() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"hello", b"world").unwrap();
    let result = engine.get(b"hello").unwrap();

    assert_eq!(result, Some(b"world".to_vec()));
}

#[test]
fn test_engine_get_nonexistent_key() {
    let (_temp, engine) = setup_temp_engine();

    assert_eq!(engine.get(b"nonexistent").unwrap(), None);
}

#[test]
fn test_engine_overwrite() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"v1").unwrap();
    engine.put(b"key", b"v2").unwrap();

    assert_eq!(engine.get(b"key").unwrap(), Some(b"v2".to_vec()));
}

#[test]
fn test_engine_delete_reports_presence() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"value").unwrap();

    assert!(engine.delete(b"key").unwrap());
    assert!(!engine.delete(b"key").unwrap());
    assert_eq!(engine.get(b"key").unwrap(), None);
}

// =============================================================================
// Snapshot Tests
// =============================================================================

#[test]
fn test_snapshot_range_is_end_exclusive() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &["a", "b", "c", "d", "e"]);

    let pairs = engine.snapshot().unwrap().range(b"b", b"d").unwrap();

    assert_eq!(keys_of(&pairs), vec!["b", "c"]);
    assert_eq!(pairs[0].1, b"v_b".to_vec());
}

#[test]
fn test_snapshot_range_empty_bounds() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &["a", "b", "c"]);

    let snapshot = engine.snapshot().unwrap();

    assert!(snapshot.range(b"b", b"b").unwrap().is_empty());
    assert!(snapshot.range(b"c", b"a").unwrap().is_empty());
}

#[test]
fn test_snapshot_scan_from_respects_limit() {
    let (_temp, engine) = setup_temp_engine();
    fill(&engine, &["a", "b", "c", "d", "e"]);

    let snapshot = engine.snapshot().unwrap();

    assert_eq!(keys_of(&snapshot.scan_from(b"b", 2).unwrap()), vec!["b", "c"]);
    assert_eq!(keys_of(&snapshot.scan_from(b"bb", 10).unwrap()), vec!["c", "d", "e"]);
    assert!(snapshot.scan_from(b"a", 0).unwrap().is_empty());
    assert!(snapshot.scan_from(b"z", 5).unwrap().is_empty());
}

#[test]
fn test_snapshot_ignores_later_writes() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"key", b"old").unwrap();

    let snapshot = engine.snapshot().unwrap();
    engine.put(b"key", b"new").unwrap();
    engine.put(b"other", b"value").unwrap();

    assert_eq!(snapshot.get(b"key").unwrap(), Some(b"old".to_vec()));
    assert_eq!(snapshot.get(b"other").unwrap(), None);
    assert_eq!(engine.get(b"key").unwrap(), Some(b"new".to_vec()));
}

// =============================================================================
// Batch Tests
// =============================================================================

#[test]
fn test_write_batch_applies_in_order() {
    let (_temp, engine) = setup_temp_engine();
    engine.put(b"old", b"value").unwrap();

    let operations = vec![
        BatchOperation::Put {
            key: b"a".to_vec(),
            value: b"1".to_vec(),
        },
        BatchOperation::Put {
            key: b"c".to_vec(),
            value: b"3".to_vec(),
        },
        BatchOperation::Delete { key: b"c".to_vec() },
        BatchOperation::Delete {
            key: b"old".to_vec(),
        },
    ];
    engine.write_batch(&operations).unwrap();

    assert_eq!(engine.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"c").unwrap(), None);
    assert_eq!(engine.get(b"old").unwrap(), None);
}

#[test]
fn test_write_empty_batch() {
    let (_temp, engine) = setup_temp_engine();

    engine.write_batch(&[]).unwrap();

    assert!(engine.snapshot().unwrap().scan_from(b"", 10).unwrap().is_empty());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_engine_reopen_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_dir = temp_dir.path().join("db");

    {
        let engine = Engine::open(&db_dir, &test_options()).unwrap();
        engine.put(b"persistent", b"value").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(&db_dir, &test_options()).unwrap();
    assert_eq!(engine.get(b"persistent").unwrap(), Some(b"value".to_vec()));
}

#[test]
fn test_engine_open_with_integrity_check() {
    let temp_dir = TempDir::new().unwrap();
    let db_dir = temp_dir.path().join("db");
    let options = EngineOptions {
        verify_checksums: true,
        ..test_options()
    };

    {
        let engine = Engine::open(&db_dir, &options).unwrap();
        engine.put(b"key", b"value").unwrap();
    }

    let engine = Engine::open(&db_dir, &options).unwrap();
    assert_eq!(engine.get(b"key").unwrap(), Some(b"value".to_vec()));
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn test_engine_empty_key() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"", b"empty_key_value").unwrap();
    assert_eq!(engine.get(b"").unwrap(), Some(b"empty_key_value".to_vec()));
}

#[test]
fn test_engine_empty_value() {
    let (_temp, engine) = setup_temp_engine();

    engine.put(b"key", b"").unwrap();
    assert_eq!(engine.get(b"key").unwrap(), Some(b"".to_vec()));
}

#[test]
fn test_engine_large_value() {
    let (_temp, engine) = setup_temp_engine();

    let large_value = vec![0xAB; 100_000]; // 100 KB
    engine.put(b"large_key", &large_value).unwrap();

    assert_eq!(engine.get(b"large_key").unwrap(), Some(large_value));
}

#[test]
fn test_engine_binary_data() {
    let (_temp, engine) = setup_temp_engine();

    // Binary key and value with null bytes
    let key = b"\x00\x01\x02\xFF\xFE";
    let value = b"\xFF\x00\xAB\xCD\x00";

    engine.put(key, value).unwrap();
    assert_eq!(engine.get(key).unwrap(), Some(value.to_vec()));
}
