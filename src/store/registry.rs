//! Database registry
//!
//! Owns every [`Database`] handle, the name → identifier index and the
//! manifest file describing registered databases.
//!
//! ## Concurrency
//! The handle map, the name index and manifest I/O sit behind one mutex.
//! Database-level work never runs under it: dispatch only takes the lock to
//! resolve a target (mounting it on demand) and clone its queue.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use parking_lot::Mutex;

use super::database::{Database, DbQueue, MountStatus};
use crate::config::{CoreConfig, EngineOptions};
use crate::error::{ElevatorError, Result};
use crate::protocol::DbTarget;

#[derive(Default)]
struct StoreState {
    /// uid → handle
    container: HashMap<String, Database>,

    /// name → uid, rebuilt from `container` after every membership change
    name_to_uid: HashMap<String, String>,
}

impl StoreState {
    fn rebuild_index(&mut self) {
        self.name_to_uid = self
            .container
            .values()
            .map(|db| (db.name.clone(), db.uid.clone()))
            .collect();
    }

    fn uid_of(&self, name: &str) -> Result<&String> {
        self.name_to_uid
            .get(name)
            .ok_or_else(|| ElevatorError::NoSuchDatabase(name.to_string()))
    }

    fn get_mut(&mut self, uid: &str) -> Result<&mut Database> {
        self.container
            .get_mut(uid)
            .ok_or_else(|| ElevatorError::NoSuchDatabaseUid(uid.to_string()))
    }
}

/// The set of databases served by one process
pub struct DbStore {
    config: CoreConfig,
    options: EngineOptions,
    state: Mutex<StoreState>,
}

impl DbStore {
    /// Create an empty store
    pub fn new(config: CoreConfig, options: EngineOptions) -> Self {
        Self {
            config,
            options,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Load the store from its manifest, or create the default database
    /// when no manifest can be read
    pub fn initialize(config: CoreConfig, options: EngineOptions) -> Result<Self> {
        let store = Self::new(config, options);
        match store.load() {
            Ok(()) => {
                tracing::info!(
                    "Loaded {} database(s) from {}",
                    store.len(),
                    store.config.store_path.display()
                );
            }
            Err(e) => {
                tracing::info!(
                    "No usable manifest at {} ({}), creating default database {}",
                    store.config.store_path.display(),
                    e,
                    store.config.default_db
                );
                let default_db = store.config.default_db.clone();
                store.create(&default_db)?;
            }
        }
        Ok(store)
    }

    // =========================================================================
    // Manifest
    // =========================================================================

    /// Replace registered databases with the manifest's content
    ///
    /// Loaded databases start unmounted. Handles are keyed by their own
    /// `uid`, whatever key the manifest stored them under; a manifest that
    /// repeats a name or an identifier is rejected.
    pub fn load(&self) -> Result<()> {
        let data = fs::read(&self.config.store_path)?;
        let entries: HashMap<String, Database> = serde_json::from_slice(&data)?;

        let mut container = HashMap::with_capacity(entries.len());
        let mut names = HashSet::with_capacity(entries.len());
        for (key, db) in entries {
            if key != db.uid {
                tracing::warn!(%key, uid = %db.uid, "Manifest key differs from database uid");
            }
            if !names.insert(db.name.clone()) {
                return Err(ElevatorError::Serialization(format!(
                    "Manifest lists database {:?} more than once",
                    db.name
                )));
            }
            if container.contains_key(&db.uid) {
                return Err(ElevatorError::Serialization(format!(
                    "Manifest lists database uid {:?} more than once",
                    db.uid
                )));
            }
            container.insert(db.uid.clone(), db);
        }

        let mut state = self.state.lock();
        state.container = container;
        state.rebuild_index();
        Ok(())
    }

    /// Write registered databases to the manifest
    pub fn write_to_file(&self) -> Result<()> {
        let state = self.state.lock();
        self.persist(&state)
    }

    /// Manifest write; the caller holds the state lock
    fn persist(&self, state: &StoreState) -> Result<()> {
        let store_path = &self.config.store_path;
        let base = match store_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !base.is_dir() {
            return Err(ElevatorError::NoSuchPath(base.display().to_string()));
        }

        let data = serde_json::to_vec_pretty(&state.container)?;
        let tmp_path = store_path.with_extension("tmp");
        fs::write(&tmp_path, data)?;
        fs::rename(&tmp_path, store_path)?;
        Ok(())
    }

    // =========================================================================
    // Store Operations
    // =========================================================================

    /// Register, persist and mount a new database; returns its identifier
    ///
    /// A database whose mount fails stays registered (unmounted) and is
    /// mounted again on its next request.
    pub fn create(&self, name: &str) -> Result<String> {
        let mut state = self.state.lock();

        if state.name_to_uid.contains_key(name) {
            return Err(ElevatorError::DatabaseExists(name.to_string()));
        }
        let path = self.resolve_path(name)?;

        let db = Database::new(name, path);
        let uid = db.uid.clone();
        state.container.insert(uid.clone(), db);
        state.rebuild_index();

        if let Err(e) = self.persist(&state) {
            tracing::error!("Failed to persist store after creating {}: {}", name, e);
            return Err(e);
        }

        state.get_mut(&uid)?.mount(&self.options).map_err(|e| {
            tracing::error!("Failed to mount new database {}: {}", name, e);
            e
        })?;

        tracing::info!(%uid, "Database {} added to store", name);
        Ok(uid)
    }

    /// Unmount, unregister and delete a database
    pub fn drop_db(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock();

        let uid = state.uid_of(name)?.clone();
        let mut db = match state.container.remove(&uid) {
            Some(db) => db,
            None => return Err(ElevatorError::NoSuchDatabaseUid(uid)),
        };

        match db.unmount() {
            Ok(()) | Err(ElevatorError::AlreadyUnmounted(_)) => {}
            Err(e) => tracing::warn!("Error unmounting {} before drop: {}", name, e),
        }
        state.rebuild_index();
        self.persist(&state)?;

        remove_storage(&db.path)?;
        tracing::info!(%uid, "Database {} dropped from store", name);
        Ok(())
    }

    /// Resolve a database name to its identifier
    pub fn connect(&self, name: &str) -> Result<String> {
        self.state.lock().uid_of(name).cloned()
    }

    /// Mount the database with identifier `uid`
    pub fn mount(&self, uid: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.get_mut(uid)?.mount(&self.options)
    }

    /// Unmount the database with identifier `uid`
    pub fn unmount(&self, uid: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.get_mut(uid)?.unmount()
    }

    /// Names of all registered databases, in no particular order
    pub fn list(&self) -> Vec<String> {
        self.state
            .lock()
            .container
            .values()
            .map(|db| db.name.clone())
            .collect()
    }

    /// Mount status of the database named `name`
    pub fn status(&self, name: &str) -> Result<MountStatus> {
        let state = self.state.lock();
        let uid = state.uid_of(name)?;
        state
            .container
            .get(uid)
            .map(Database::status)
            .ok_or_else(|| ElevatorError::NoSuchDatabaseUid(uid.clone()))
    }

    /// Whether the database named `name` is registered and present on disk
    pub fn exists(&self, name: &str) -> bool {
        let state = self.state.lock();
        match state.uid_of(name) {
            Ok(uid) => state
                .container
                .get(uid)
                .map_or(false, |db| db.path.exists()),
            Err(_) => false,
        }
    }

    /// Unmount every mounted database (shutdown)
    pub fn unmount_all(&self) {
        tracing::info!("Closing dbstore");
        let mut state = self.state.lock();
        for db in state.container.values_mut() {
            if db.is_mounted() {
                if let Err(e) = db.unmount() {
                    tracing::warn!("Failed to unmount {}: {}", db.name, e);
                }
            }
        }
    }

    /// Queue of the targeted database, mounting it first if needed
    pub fn queue_for(&self, target: &DbTarget) -> Result<DbQueue> {
        let mut state = self.state.lock();
        let uid = match target {
            DbTarget::Uid(uid) => uid.clone(),
            DbTarget::Name(name) => state.uid_of(name)?.clone(),
        };

        let db = state.get_mut(&uid)?;
        if !db.is_mounted() {
            db.mount(&self.options)?;
        }
        db.queue()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Number of registered databases
    pub fn len(&self) -> usize {
        self.state.lock().container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name → identifier pairs of all registered databases
    pub fn index(&self) -> HashMap<String, String> {
        self.state.lock().name_to_uid.clone()
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Storage location for a new database named `name`
    fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        if name.trim().is_empty() {
            return Err(ElevatorError::Request(
                "Database name must not be empty".to_string(),
            ));
        }
        if !is_file_path(name) {
            return Ok(self.config.storage_path.join(name));
        }

        let path = Path::new(name);
        if !path.is_absolute() {
            return Err(ElevatorError::RelativePathNotAllowed(name.to_string()));
        }
        let parent = path.parent().unwrap_or(path);
        if !parent.is_dir() {
            return Err(ElevatorError::NoSuchPath(parent.display().to_string()));
        }
        Ok(path.to_path_buf())
    }
}

/// Whether a database name designates a filesystem path
pub fn is_file_path(name: &str) -> bool {
    name.starts_with('.') || name.contains('/') || name.contains(MAIN_SEPARATOR)
}

fn remove_storage(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)?;
    } else if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}
