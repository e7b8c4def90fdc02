//! Error types for Elevator
//!
//! Provides a unified error type for all operations. Every variant maps to
//! exactly one wire [`Status`], so a failure anywhere in the store can be
//! turned into a response without losing its kind.

use thiserror::Error;

use crate::protocol::Status;

/// Result type alias using ElevatorError
pub type Result<T> = std::result::Result<T, ElevatorError>;

/// Unified error type for Elevator operations
#[derive(Debug, Error)]
pub enum ElevatorError {
    // -------------------------------------------------------------------------
    // Database Operation Errors
    // -------------------------------------------------------------------------
    #[error("Key {:?} does not exist", String::from_utf8_lossy(.0))]
    Key(Vec<u8>),

    #[error("Value error: {0}")]
    Value(String),

    #[error("Database error: {0}")]
    Database(String),

    // -------------------------------------------------------------------------
    // Store Errors
    // -------------------------------------------------------------------------
    #[error("No such db {0:?}")]
    NoSuchDatabase(String),

    #[error("No such db uid {0:?}")]
    NoSuchDatabaseUid(String),

    #[error("Database {0:?} already exists")]
    DatabaseExists(String),

    #[error("Creating database from relative path {0:?} not allowed")]
    RelativePathNotAllowed(String),

    #[error("{0} does not exist")]
    NoSuchPath(String),

    #[error("Database {0:?} already mounted")]
    AlreadyMounted(String),

    #[error("Database {0:?} already unmounted")]
    AlreadyUnmounted(String),

    // -------------------------------------------------------------------------
    // Request Errors
    // -------------------------------------------------------------------------
    #[error("Unknown command {0:?}")]
    UnknownCommand(String),

    #[error("Empty command in request")]
    EmptyCommand,

    #[error("Request error: {0}")]
    Request(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ElevatorError {
    /// Wire status code reported to clients for this error
    pub fn status(&self) -> Status {
        match self {
            ElevatorError::Key(_) => Status::KeyError,
            ElevatorError::Value(_) => Status::ValueError,
            ElevatorError::Database(_) | ElevatorError::Io(_) => Status::DatabaseError,
            ElevatorError::NoSuchDatabase(_) => Status::NoSuchDatabase,
            ElevatorError::NoSuchDatabaseUid(_) => Status::NoSuchDatabaseUid,
            ElevatorError::DatabaseExists(_) => Status::DatabaseExists,
            ElevatorError::RelativePathNotAllowed(_) => Status::RelativePathNotAllowed,
            ElevatorError::NoSuchPath(_) => Status::NoSuchPath,
            ElevatorError::AlreadyMounted(_) => Status::AlreadyMounted,
            ElevatorError::AlreadyUnmounted(_) => Status::AlreadyUnmounted,
            ElevatorError::UnknownCommand(_) => Status::UnknownCommand,
            ElevatorError::EmptyCommand => Status::EmptyCommand,
            ElevatorError::Request(_)
            | ElevatorError::Serialization(_)
            | ElevatorError::Protocol(_) => Status::RequestError,
            ElevatorError::Network(_) | ElevatorError::Config(_) => Status::UnknownError,
        }
    }
}

impl From<redb::Error> for ElevatorError {
    fn from(e: redb::Error) -> Self {
        ElevatorError::Database(e.to_string())
    }
}

impl From<bincode::Error> for ElevatorError {
    fn from(e: bincode::Error) -> Self {
        ElevatorError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for ElevatorError {
    fn from(e: serde_json::Error) -> Self {
        ElevatorError::Serialization(e.to_string())
    }
}
