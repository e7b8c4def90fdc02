//! Pid file Tests

use std::fs;

use elevator::pidfile::PidFile;
use elevator::ElevatorError;
use tempfile::TempDir;

#[test]
fn test_pidfile_written_and_removed() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("elevator.pid");

    {
        let pidfile = PidFile::create(&path).unwrap();
        assert_eq!(pidfile.path(), path.as_path());
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, std::process::id().to_string());
    }

    assert!(!path.exists());
}

#[test]
fn test_pidfile_of_live_process_refused() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("elevator.pid");
    let _pidfile = PidFile::create(&path).unwrap();

    // Our own pid is alive
    let err = PidFile::create(&path).unwrap_err();

    assert!(matches!(err, ElevatorError::Config(_)));
}

#[test]
fn test_stale_pidfile_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("elevator.pid");
    fs::write(&path, "4194305").unwrap(); // above pid_max

    let _pidfile = PidFile::create(&path).unwrap();

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        std::process::id().to_string()
    );
}

#[test]
fn test_garbage_pidfile_replaced() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("elevator.pid");
    fs::write(&path, "not a pid").unwrap();

    assert!(PidFile::create(&path).is_ok());
}
