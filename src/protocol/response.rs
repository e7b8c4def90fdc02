//! Response definitions
//!
//! Represents responses to clients.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::ElevatorError;

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    Success = 0x00,
    KeyError = 0x01,
    ValueError = 0x02,
    DatabaseError = 0x03,
    NoSuchDatabase = 0x04,
    NoSuchDatabaseUid = 0x05,
    DatabaseExists = 0x06,
    RelativePathNotAllowed = 0x07,
    NoSuchPath = 0x08,
    AlreadyMounted = 0x09,
    AlreadyUnmounted = 0x0a,
    UnknownCommand = 0x0b,
    EmptyCommand = 0x0c,
    RequestError = 0x0d,
    UnknownError = 0x0e,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Human readable error message, empty on success
    pub err_msg: String,

    /// Result values (flattened key/value pairs for RANGE and SLICE)
    pub data: Vec<Vec<u8>>,

    /// Return address frames echoed from the request
    #[serde(skip)]
    pub id: Vec<Bytes>,
}

impl Response {
    /// Create a SUCCESS response carrying `data`
    pub fn ok(id: Vec<Bytes>, data: Vec<Vec<u8>>) -> Self {
        Self {
            status: Status::Success,
            err_msg: String::new(),
            data,
            id,
        }
    }

    /// Create an error response whose status matches the error kind
    pub fn from_error(id: Vec<Bytes>, err: &ElevatorError) -> Self {
        Self {
            status: err.status(),
            err_msg: err.to_string(),
            data: Vec::new(),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data: Vec<_> = self
            .data
            .iter()
            .map(|d| String::from_utf8_lossy(d).into_owned())
            .collect();
        write!(
            f,
            "<Response status:{:?} err_msg:{} data:{:?}>",
            self.status, self.err_msg, data
        )
    }
}
