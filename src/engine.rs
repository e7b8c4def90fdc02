//! Engine Module
//!
//! Adapter around the embedded ordered key-value engine backing one database.
//!
//! ## Responsibilities
//! - Open/close the engine file under a database directory
//! - Point get/put/delete
//! - Point-in-time snapshots for multi-key reads and ordered scans
//! - Atomic batch writes
//!
//! An `Engine` is not shared: the database handle owning it touches it from a
//! single thread, so no locking happens at this layer.

use std::fs;
use std::path::{Path, PathBuf};

use redb::{Database, ReadTransaction, ReadableTable, TableDefinition};

use crate::config::EngineOptions;
use crate::error::{ElevatorError, Result};
use crate::store::BatchOperation;

/// Single table holding every key of a database
const DATA_TABLE: TableDefinition<&[u8], &[u8]> = TableDefinition::new("data");

fn storage_err<E: Into<redb::Error>>(e: E) -> ElevatorError {
    let e: redb::Error = e.into();
    ElevatorError::from(e)
}

/// Open connection to one database's storage
pub struct Engine {
    /// Database directory
    path: PathBuf,

    db: Database,
}

impl Engine {
    const DATA_FILENAME: &'static str = "data.redb";

    /// Open or create the engine under directory `path`
    ///
    /// On open:
    /// 1. Create the database directory if it doesn't exist
    /// 2. Open/create the engine file with the configured cache
    /// 3. Optionally verify the file's integrity
    /// 4. Ensure the data table exists so readers never miss it
    pub fn open(path: &Path, options: &EngineOptions) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut db = Database::builder()
            .set_cache_size(options.cache_size)
            .create(path.join(Self::DATA_FILENAME))
            .map_err(storage_err)?;

        if options.verify_checksums {
            let clean = db.check_integrity().map_err(storage_err)?;
            if !clean {
                tracing::warn!("Repaired {} during integrity check", path.display());
            }
        }

        tracing::debug!(
            path = %path.display(),
            compression = options.compression,
            block_size = options.block_size,
            bloom_filter_bits = options.bloom_filter_bits,
            max_open_files = options.max_open_files,
            write_buffer_size = options.write_buffer_size,
            "Engine options not applied by the storage backend"
        );

        let txn = db.begin_write().map_err(storage_err)?;
        txn.open_table(DATA_TABLE).map_err(storage_err)?;
        txn.commit().map_err(storage_err)?;

        Ok(Self {
            path: path.to_path_buf(),
            db,
        })
    }

    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.snapshot()?.get(key)
    }

    /// Put a key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(DATA_TABLE).map_err(storage_err)?;
            table.insert(key, value).map_err(storage_err)?;
        }
        txn.commit().map_err(storage_err)
    }

    /// Delete a key
    ///
    /// Returns whether the key was present.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        let removed = {
            let mut table = txn.open_table(DATA_TABLE).map_err(storage_err)?;
            let removed = table.remove(key).map_err(storage_err)?.is_some();
            removed
        };
        txn.commit().map_err(storage_err)?;
        Ok(removed)
    }

    /// Apply every operation in one atomic write, in sequence order
    pub fn write_batch(&self, operations: &[BatchOperation]) -> Result<()> {
        let txn = self.db.begin_write().map_err(storage_err)?;
        {
            let mut table = txn.open_table(DATA_TABLE).map_err(storage_err)?;
            for operation in operations {
                match operation {
                    BatchOperation::Put { key, value } => {
                        table
                            .insert(key.as_slice(), value.as_slice())
                            .map_err(storage_err)?;
                    }
                    BatchOperation::Delete { key } => {
                        table.remove(key.as_slice()).map_err(storage_err)?;
                    }
                }
            }
        }
        txn.commit().map_err(storage_err)
    }

    /// Take a consistent point-in-time view of the data
    pub fn snapshot(&self) -> Result<Snapshot> {
        let txn = self.db.begin_read().map_err(storage_err)?;
        Ok(Snapshot { txn })
    }

    /// Close the engine, releasing the underlying file
    pub fn close(self) -> Result<()> {
        tracing::debug!("Closing engine at {}", self.path.display());
        drop(self.db);
        Ok(())
    }

    /// Get the database directory path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Read-only view of a database as of the moment it was taken
///
/// Writes committed after the snapshot was taken are invisible to it.
pub struct Snapshot {
    txn: ReadTransaction,
}

impl Snapshot {
    /// Get a value by key
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let table = self.txn.open_table(DATA_TABLE).map_err(storage_err)?;
        let value = table.get(key).map_err(storage_err)?;
        Ok(value.map(|v| v.value().to_vec()))
    }

    /// All pairs with `start <= key < end`, ascending
    pub fn range(&self, start: &[u8], end: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        if start >= end {
            return Ok(Vec::new());
        }
        let table = self.txn.open_table(DATA_TABLE).map_err(storage_err)?;
        let mut pairs = Vec::new();
        for entry in table.range(start..end).map_err(storage_err)? {
            let (key, value) = entry.map_err(storage_err)?;
            pairs.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(pairs)
    }

    /// Up to `limit` pairs starting at the first key `>= start`, ascending
    pub fn scan_from(&self, start: &[u8], limit: usize) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let table = self.txn.open_table(DATA_TABLE).map_err(storage_err)?;
        let mut pairs = Vec::with_capacity(limit.min(1024));
        for entry in table.range(start..).map_err(storage_err)?.take(limit) {
            let (key, value) = entry.map_err(storage_err)?;
            pairs.push((key.value().to_vec(), value.value().to_vec()));
        }
        Ok(pairs)
    }
}
