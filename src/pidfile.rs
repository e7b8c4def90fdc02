//! Pid file handling
//!
//! A pid file names the running server process. Startup refuses to proceed
//! while the recorded process is still alive.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ElevatorError, Result};

/// A pid file owned by this process, removed on drop
#[derive(Debug)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write our pid to `path`
    ///
    /// Fails if `path` names a process that is still running.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(pid) = read_pid(path) {
            if process_alive(pid) {
                return Err(ElevatorError::Config(format!(
                    "pid file found, ensure elevator is not running or delete {}",
                    path.display()
                )));
            }
            tracing::warn!("Removing stale pid file {} (pid {})", path.display(), pid);
        }

        fs::write(path, std::process::id().to_string())?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PidFile {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Error removing {}: {}", self.path.display(), e);
        }
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    fs::read_to_string(path).ok()?.trim().parse().ok()
}

fn process_alive(pid: u32) -> bool {
    Path::new(&format!("/proc/{}", pid)).exists()
}
