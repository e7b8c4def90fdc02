//! Database handle
//!
//! One `Database` per logical database. While mounted, a handle owns an
//! [`Engine`] that lives on a dedicated processing thread fed by a bounded
//! queue. Every operation against the engine runs on that thread, one at a
//! time and in arrival order, so the engine never needs a lock.
//!
//! ```text
//!   worker ─┐                       ┌────────────────────────┐
//!   worker ─┼──▶ queue (FIFO) ─────▶│ processing loop        │──▶ Engine
//!   worker ─┘        ▲              │ (one thread per mount) │
//!                    └── reply ◀────┴────────────────────────┘
//! ```

use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::batch::{parse_batch_args, BatchOperation};
use crate::config::EngineOptions;
use crate::engine::Engine;
use crate::error::{ElevatorError, Result};
use crate::protocol::DbCommand;

/// Capacity of a mounted database's request queue
pub const QUEUE_CAPACITY: usize = 100;

/// Whether a database currently has a live engine and processing loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountStatus {
    Unmounted,
    Mounted,
}

// =============================================================================
// Operations
// =============================================================================

/// A database-level operation with validated arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbOperation {
    Get { key: Vec<u8> },
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
    MGet { keys: Vec<Vec<u8>> },
    Range { start: Vec<u8>, end: Vec<u8> },
    Slice { start: Vec<u8>, limit: usize },
    Batch { operations: Vec<BatchOperation> },
}

impl DbOperation {
    /// Validate request arguments for `command`
    ///
    /// Wrong arity or malformed arguments fail with a request error, so a
    /// malformed request never reaches a processing loop.
    pub fn parse(command: DbCommand, args: &[Vec<u8>]) -> Result<Self> {
        let operation = match command {
            DbCommand::Get => {
                let [key] = exact::<1>(command, args)?;
                DbOperation::Get { key: key.clone() }
            }
            DbCommand::Put => {
                let [key, value] = exact::<2>(command, args)?;
                DbOperation::Put {
                    key: key.clone(),
                    value: value.clone(),
                }
            }
            DbCommand::Delete => {
                let [key] = exact::<1>(command, args)?;
                DbOperation::Delete { key: key.clone() }
            }
            DbCommand::MGet => DbOperation::MGet {
                keys: args.to_vec(),
            },
            DbCommand::Range => {
                let [start, end] = exact::<2>(command, args)?;
                DbOperation::Range {
                    start: start.clone(),
                    end: end.clone(),
                }
            }
            DbCommand::Slice => {
                let [start, limit] = exact::<2>(command, args)?;
                DbOperation::Slice {
                    start: start.clone(),
                    limit: parse_limit(limit)?,
                }
            }
            DbCommand::Batch => DbOperation::Batch {
                operations: parse_batch_args(args)?,
            },
        };
        Ok(operation)
    }
}

fn exact<const N: usize>(command: DbCommand, args: &[Vec<u8>]) -> Result<&[Vec<u8>; N]> {
    args.try_into().map_err(|_| {
        ElevatorError::Request(format!(
            "{} expects {} argument(s), got {}",
            command.as_str(),
            N,
            args.len()
        ))
    })
}

fn parse_limit(raw: &[u8]) -> Result<usize> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|s| s.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            ElevatorError::Request(format!(
                "Invalid slice limit {:?}",
                String::from_utf8_lossy(raw)
            ))
        })
}

// =============================================================================
// Processing Loop
// =============================================================================

/// Result values of one operation
pub type DbResult = Result<Vec<Vec<u8>>>;

/// A queued operation and where to send its result
#[derive(Debug)]
struct DbJob {
    operation: DbOperation,
    reply: Sender<DbResult>,
}

/// Entry of a processing loop's queue
#[derive(Debug)]
enum LoopMessage {
    Run(DbJob),

    /// Queued by unmount; jobs queued behind it never run and their callers
    /// get a database error
    Stop,
}

/// Sending side of a mounted database's queue
///
/// Cheap to clone; holding one does not keep the registry locked.
#[derive(Debug, Clone)]
pub struct DbQueue {
    name: String,
    jobs: Sender<LoopMessage>,
}

impl DbQueue {
    /// Enqueue an operation and block until the processing loop answers
    pub fn call(&self, operation: DbOperation) -> DbResult {
        let (reply, result) = channel::bounded(1);
        self.jobs
            .send(LoopMessage::Run(DbJob { operation, reply }))
            .map_err(|_| {
                ElevatorError::Database(format!("Database {:?} is unmounted", self.name))
            })?;
        result.recv().map_err(|_| {
            ElevatorError::Database(format!(
                "Database {:?} stopped before answering",
                self.name
            ))
        })?
    }
}

fn run_loop(name: String, engine: Engine, inbox: Receiver<LoopMessage>) {
    for message in inbox.iter() {
        let job = match message {
            LoopMessage::Run(job) => job,
            LoopMessage::Stop => break,
        };
        let result = execute(&engine, job.operation);
        if let Err(ref e) = result {
            tracing::debug!(db = %name, "{}", e);
        }
        // The requester may have given up; nothing to do then
        let _ = job.reply.send(result);
    }
    drop(inbox);

    if let Err(e) = engine.close() {
        tracing::warn!(db = %name, "Failed to close engine: {}", e);
    }
    tracing::trace!(db = %name, "Processing loop exited");
}

/// Run one operation against the engine (processing loop only)
fn execute(engine: &Engine, operation: DbOperation) -> DbResult {
    match operation {
        DbOperation::Get { key } => match engine.get(&key)? {
            Some(value) => Ok(vec![value]),
            None => Err(ElevatorError::Key(key)),
        },
        DbOperation::Put { key, value } => {
            engine.put(&key, &value).map_err(write_failed)?;
            Ok(Vec::new())
        }
        DbOperation::Delete { key } => {
            if engine.delete(&key)? {
                Ok(Vec::new())
            } else {
                Err(ElevatorError::Key(key))
            }
        }
        DbOperation::MGet { keys } => {
            let snapshot = engine.snapshot()?;
            keys.iter()
                .map(|key| -> Result<Vec<u8>> { Ok(snapshot.get(key)?.unwrap_or_default()) })
                .collect()
        }
        DbOperation::Range { start, end } => {
            let pairs = engine.snapshot()?.range(&start, &end)?;
            Ok(flatten(pairs))
        }
        DbOperation::Slice { start, limit } => {
            let pairs = engine.snapshot()?.scan_from(&start, limit)?;
            Ok(flatten(pairs))
        }
        DbOperation::Batch { operations } => {
            engine.write_batch(&operations).map_err(write_failed)?;
            Ok(Vec::new())
        }
    }
}

fn write_failed(e: ElevatorError) -> ElevatorError {
    ElevatorError::Value(e.to_string())
}

fn flatten(pairs: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<Vec<u8>> {
    pairs.into_iter().flat_map(|(k, v)| [k, v]).collect()
}

// =============================================================================
// Database Handle
// =============================================================================

#[derive(Debug)]
struct Mounted {
    jobs: Sender<LoopMessage>,
    worker: JoinHandle<()>,
}

/// In-memory handle for one logical database
///
/// Only `name`, `uid` and `path` are persisted in the store manifest.
#[derive(Debug, Serialize, Deserialize)]
pub struct Database {
    pub name: String,
    pub uid: String,
    pub path: PathBuf,

    #[serde(skip)]
    mounted: Option<Mounted>,
}

impl Database {
    /// Create an unmounted handle with a fresh identifier
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            uid: Uuid::new_v4().to_string(),
            path: path.into(),
            mounted: None,
        }
    }

    pub fn status(&self) -> MountStatus {
        if self.mounted.is_some() {
            MountStatus::Mounted
        } else {
            MountStatus::Unmounted
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.is_some()
    }

    /// Open the engine and start the processing loop
    pub fn mount(&mut self, options: &EngineOptions) -> Result<()> {
        if self.mounted.is_some() {
            return Err(ElevatorError::AlreadyMounted(self.name.clone()));
        }

        let engine = Engine::open(&self.path, options).map_err(|e| match e {
            ElevatorError::Io(io) => ElevatorError::Database(io.to_string()),
            other => other,
        })?;

        let (jobs, inbox) = channel::bounded(QUEUE_CAPACITY);
        let name = self.name.clone();
        let worker = thread::Builder::new()
            .name(format!("db-{}", self.name))
            .spawn(move || run_loop(name, engine, inbox))
            .map_err(|e| ElevatorError::Database(e.to_string()))?;

        self.mounted = Some(Mounted { jobs, worker });
        tracing::info!(uid = %self.uid, "Database {} mounted", self.name);
        Ok(())
    }

    /// Stop the processing loop and close the engine
    ///
    /// Blocks until operations already queued have been answered and the
    /// engine is closed.
    pub fn unmount(&mut self) -> Result<()> {
        let mounted = self
            .mounted
            .take()
            .ok_or_else(|| ElevatorError::AlreadyUnmounted(self.name.clone()))?;

        // Everything queued before the stop is still answered
        let _ = mounted.jobs.send(LoopMessage::Stop);
        mounted.worker.join().map_err(|_| {
            ElevatorError::Database(format!("Processing loop of {} panicked", self.name))
        })?;

        tracing::info!(uid = %self.uid, "Database {} unmounted", self.name);
        Ok(())
    }

    /// Sending side of the queue, if mounted
    pub fn queue(&self) -> Result<DbQueue> {
        let mounted = self
            .mounted
            .as_ref()
            .ok_or_else(|| ElevatorError::AlreadyUnmounted(self.name.clone()))?;
        Ok(DbQueue {
            name: self.name.clone(),
            jobs: mounted.jobs.clone(),
        })
    }

    /// Enqueue an operation and wait for its result
    pub fn call(&self, operation: DbOperation) -> DbResult {
        self.queue()?.call(operation)
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        if self.is_mounted() {
            if let Err(e) = self.unmount() {
                tracing::warn!("Failed to unmount {} on drop: {}", self.name, e);
            }
        }
    }
}
