//! Command definitions
//!
//! Represents requests from clients. The command tag travels as a string so
//! that unknown or empty tags survive decoding and can be answered with the
//! matching error status instead of a decode failure.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::{ElevatorError, Result};

// =============================================================================
// Command Tags
// =============================================================================

/// Store-scoped command tags
pub const DB_CREATE: &str = "CREATE";
pub const DB_DROP: &str = "DROP";
pub const DB_CONNECT: &str = "CONNECT";
pub const DB_MOUNT: &str = "MOUNT";
pub const DB_UMOUNT: &str = "UNMOUNT";
pub const DB_LIST: &str = "LIST";

/// Database-scoped command tags
pub const DB_GET: &str = "GET";
pub const DB_PUT: &str = "PUT";
pub const DB_DELETE: &str = "DELETE";
pub const DB_RANGE: &str = "RANGE";
pub const DB_SLICE: &str = "SLICE";
pub const DB_MGET: &str = "MGET";
pub const DB_BATCH: &str = "BATCH";

/// Signals tagging each entry of a BATCH argument stream
pub const SIGNAL_BATCH_PUT: &str = "BATCH-PUT";
pub const SIGNAL_BATCH_DELETE: &str = "BATCH-DELETE";

/// Commands addressed to the store itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCommand {
    Create,
    Drop,
    Connect,
    Mount,
    Unmount,
    List,
}

/// Commands addressed to one specific database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DbCommand {
    Get,
    Put,
    Delete,
    Range,
    Slice,
    MGet,
    Batch,
}

/// Classification of a request's command tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Store(StoreCommand),
    Database(DbCommand),
}

impl StoreCommand {
    pub const ALL: [StoreCommand; 6] = [
        StoreCommand::Create,
        StoreCommand::Drop,
        StoreCommand::Connect,
        StoreCommand::Mount,
        StoreCommand::Unmount,
        StoreCommand::List,
    ];

    /// Wire tag of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreCommand::Create => DB_CREATE,
            StoreCommand::Drop => DB_DROP,
            StoreCommand::Connect => DB_CONNECT,
            StoreCommand::Mount => DB_MOUNT,
            StoreCommand::Unmount => DB_UMOUNT,
            StoreCommand::List => DB_LIST,
        }
    }
}

impl DbCommand {
    pub const ALL: [DbCommand; 7] = [
        DbCommand::Get,
        DbCommand::Put,
        DbCommand::Delete,
        DbCommand::Range,
        DbCommand::Slice,
        DbCommand::MGet,
        DbCommand::Batch,
    ];

    /// Wire tag of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            DbCommand::Get => DB_GET,
            DbCommand::Put => DB_PUT,
            DbCommand::Delete => DB_DELETE,
            DbCommand::Range => DB_RANGE,
            DbCommand::Slice => DB_SLICE,
            DbCommand::MGet => DB_MGET,
            DbCommand::Batch => DB_BATCH,
        }
    }
}

impl FromStr for CommandKind {
    type Err = ElevatorError;

    /// Classify a command tag (case-insensitive, surrounding whitespace ignored)
    fn from_str(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ElevatorError::EmptyCommand);
        }
        let upper = tag.to_ascii_uppercase();

        if let Some(cmd) = StoreCommand::ALL.iter().find(|c| c.as_str() == upper) {
            return Ok(CommandKind::Store(*cmd));
        }
        if let Some(cmd) = DbCommand::ALL.iter().find(|c| c.as_str() == upper) {
            return Ok(CommandKind::Database(*cmd));
        }
        Err(ElevatorError::UnknownCommand(tag.to_string()))
    }
}

// =============================================================================
// Request
// =============================================================================

/// Database a database-scoped request is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DbTarget {
    /// Identifier returned by CONNECT
    Uid(String),

    /// Registered database name
    Name(String),
}

/// A request received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Command tag (see the `DB_*` constants)
    pub command: String,

    /// Target database, required by database-scoped commands
    pub target: Option<DbTarget>,

    /// Byte-string arguments
    pub args: Vec<Vec<u8>>,

    /// Return address frames, owned by the transport and never encoded
    #[serde(skip)]
    pub id: Vec<Bytes>,
}

impl Request {
    /// Build a store-scoped request about `db_name`
    pub fn store(command: StoreCommand, db_name: &str) -> Self {
        Self {
            command: command.as_str().to_string(),
            target: None,
            args: vec![db_name.as_bytes().to_vec()],
            id: Vec::new(),
        }
    }

    /// Build a LIST request
    pub fn list() -> Self {
        Self {
            command: DB_LIST.to_string(),
            ..Default::default()
        }
    }

    /// Build a database-scoped request
    pub fn database(command: DbCommand, target: DbTarget, args: Vec<Vec<u8>>) -> Self {
        Self {
            command: command.as_str().to_string(),
            target: Some(target),
            args,
            id: Vec::new(),
        }
    }

    /// Classify this request's command tag
    pub fn kind(&self) -> Result<CommandKind> {
        self.command.parse()
    }

    /// Parse a textual request line: `COMMAND arg1 arg2 ...`
    ///
    /// Database-scoped commands are addressed to `target`.
    pub fn from_line(line: &str, target: Option<DbTarget>) -> Result<Self> {
        let mut words = line.split_whitespace();
        let command = words.next().ok_or(ElevatorError::EmptyCommand)?;
        let kind: CommandKind = command.parse()?;
        let args = words.map(|w| w.as_bytes().to_vec()).collect();

        Ok(Self {
            command: command.to_ascii_uppercase(),
            target: match kind {
                CommandKind::Store(_) => None,
                CommandKind::Database(_) => target,
            },
            args,
            id: Vec::new(),
        })
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let args: Vec<_> = self
            .args
            .iter()
            .map(|a| String::from_utf8_lossy(a).into_owned())
            .collect();
        write!(
            f,
            "<Request target:{:?} command:{} args:{:?}>",
            self.target, self.command, args
        )
    }
}
