//! Blocking client
//!
//! Speaks the framed protocol to an Elevator server over TCP. Used by the
//! command-line client and the end-to-end tests.
//!
//! ```no_run
//! use elevator::Client;
//!
//! let mut client = Client::connect("127.0.0.1:4141")?;
//! client.use_database("default")?;
//! client.put(b"key", b"value")?;
//! let response = client.get(b"key")?;
//! assert_eq!(response.data, vec![b"value".to_vec()]);
//! # Ok::<(), elevator::ElevatorError>(())
//! ```

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::error::{ElevatorError, Result};
use crate::protocol::{
    decode_response, encode_request, read_message, write_message, DbCommand, DbTarget, Request,
    Response, StoreCommand,
};
use crate::store::{batch_args, BatchOperation};

/// Connection to an Elevator server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,

    /// Database addressed by database commands
    target: Option<DbTarget>,
}

impl Client {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| ElevatorError::Network(format!("Cannot connect: {}", e)))?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            target: None,
        })
    }

    /// Send a request and wait for its response
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        let payload = encode_request(request)?;
        write_message(&mut self.writer, &[Bytes::from(payload)])?;

        let frames = read_message(&mut self.reader)?;
        let payload = frames
            .last()
            .ok_or_else(|| ElevatorError::Protocol("Response without payload".to_string()))?;
        decode_response(payload)
    }

    // =========================================================================
    // Database Selection
    // =========================================================================

    /// Resolve `name` on the server and address later database commands to it
    pub fn use_database(&mut self, name: &str) -> Result<Response> {
        let response = self.connect_db(name)?;
        if response.is_success() {
            if let Some(uid) = response.data.first() {
                self.target = Some(DbTarget::Uid(String::from_utf8_lossy(uid).into_owned()));
            }
        }
        Ok(response)
    }

    /// Address later database commands to `target`
    pub fn set_target(&mut self, target: DbTarget) {
        self.target = Some(target);
    }

    pub fn target(&self) -> Option<&DbTarget> {
        self.target.as_ref()
    }

    // =========================================================================
    // Store Commands
    // =========================================================================

    pub fn create(&mut self, name: &str) -> Result<Response> {
        self.request(&Request::store(StoreCommand::Create, name))
    }

    pub fn drop_db(&mut self, name: &str) -> Result<Response> {
        self.request(&Request::store(StoreCommand::Drop, name))
    }

    pub fn connect_db(&mut self, name: &str) -> Result<Response> {
        self.request(&Request::store(StoreCommand::Connect, name))
    }

    pub fn mount(&mut self, name: &str) -> Result<Response> {
        self.request(&Request::store(StoreCommand::Mount, name))
    }

    pub fn unmount(&mut self, name: &str) -> Result<Response> {
        self.request(&Request::store(StoreCommand::Unmount, name))
    }

    pub fn list(&mut self) -> Result<Response> {
        self.request(&Request::list())
    }

    // =========================================================================
    // Database Commands
    // =========================================================================

    pub fn get(&mut self, key: &[u8]) -> Result<Response> {
        self.db_request(DbCommand::Get, vec![key.to_vec()])
    }

    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<Response> {
        self.db_request(DbCommand::Put, vec![key.to_vec(), value.to_vec()])
    }

    pub fn delete(&mut self, key: &[u8]) -> Result<Response> {
        self.db_request(DbCommand::Delete, vec![key.to_vec()])
    }

    pub fn mget(&mut self, keys: &[&[u8]]) -> Result<Response> {
        let args = keys.iter().map(|k| k.to_vec()).collect();
        self.db_request(DbCommand::MGet, args)
    }

    pub fn range(&mut self, start: &[u8], end: &[u8]) -> Result<Response> {
        self.db_request(DbCommand::Range, vec![start.to_vec(), end.to_vec()])
    }

    pub fn slice(&mut self, start: &[u8], limit: usize) -> Result<Response> {
        let limit = limit.to_string().into_bytes();
        self.db_request(DbCommand::Slice, vec![start.to_vec(), limit])
    }

    pub fn batch(&mut self, operations: &[BatchOperation]) -> Result<Response> {
        self.db_request(DbCommand::Batch, batch_args(operations))
    }

    fn db_request(&mut self, command: DbCommand, args: Vec<Vec<u8>>) -> Result<Response> {
        let target = self.target.clone().ok_or_else(|| {
            ElevatorError::Request("No database selected, call use_database first".to_string())
        })?;
        self.request(&Request::database(command, target, args))
    }
}
