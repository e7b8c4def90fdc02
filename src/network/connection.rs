//! Connection Handler
//!
//! Reads multi-part messages from one client connection and forwards them,
//! prefixed with the connection's identity frame, to the worker pool.
//! Responses travel back through the server's relay, which finds the
//! connection again by that identity and queues them for the connection's
//! own writer thread.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use super::ConnectionTable;
use crate::error::{ElevatorError, Result};
use crate::protocol::{read_message, write_message};

/// Replies a connection may have queued before it counts as stalled
pub const OUTBOUND_CAPACITY: usize = 64;

/// Identity frame for connection `id`
pub fn identity_frame(id: u64) -> Bytes {
    Bytes::copy_from_slice(&id.to_be_bytes())
}

/// Connection id carried by an identity frame
pub fn parse_identity(frame: &[u8]) -> Option<u64> {
    let bytes: [u8; 8] = frame.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Writing side of a connection, as kept in the [`ConnectionTable`]
pub struct ReplyHandle {
    replies: Sender<Vec<Bytes>>,
    stream: TcpStream,
}

impl ReplyHandle {
    /// Queue a reply for the connection's writer; never blocks
    pub fn try_send(&self, frames: Vec<Bytes>) -> std::result::Result<(), TrySendError<Vec<Bytes>>> {
        self.replies.try_send(frames)
    }

    /// Close the socket, waking both the reader and a blocked writer
    pub fn close(&self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Reading side of a single client connection
pub struct Connection {
    id: u64,

    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// Peer address for logging
    peer_addr: String,

    writer: Option<JoinHandle<()>>,
}

impl Connection {
    /// Set up a connection, start its writer and register the writing side
    /// in `table`
    pub fn register(id: u64, stream: TcpStream, table: &Arc<ConnectionTable>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Accepted sockets may inherit the listener's non-blocking mode
        stream.set_nonblocking(false)?;
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let (replies, outbox) = channel::bounded(OUTBOUND_CAPACITY);
        let write_stream = stream.try_clone()?;
        let writer = thread::Builder::new()
            .name(format!("conn-{}-writer", id))
            .spawn(move || write_loop(id, write_stream, outbox))
            .map_err(|e| ElevatorError::Network(format!("Failed to spawn writer: {}", e)))?;

        let handle = ReplyHandle {
            replies,
            stream: stream.try_clone()?,
        };
        table.lock().insert(id, handle);

        Ok(Self {
            id,
            reader: BufReader::new(stream),
            peer_addr,
            writer: Some(writer),
        })
    }

    /// Forward messages until the client disconnects or the server closes
    /// the connection
    pub fn handle(mut self, inbound: Sender<Vec<Bytes>>, table: Arc<ConnectionTable>) {
        tracing::debug!(conn = self.id, "Connection established from {}", self.peer_addr);

        loop {
            let frames = match read_message(&mut self.reader) {
                Ok(frames) => frames,
                Err(ElevatorError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!(conn = self.id, "Client {} disconnected", self.peer_addr);
                    break;
                }
                Err(e) => {
                    tracing::warn!(conn = self.id, "Error reading from {}: {}", self.peer_addr, e);
                    break;
                }
            };

            let mut message = Vec::with_capacity(frames.len() + 1);
            message.push(identity_frame(self.id));
            message.extend(frames);

            if inbound.send(message).is_err() {
                tracing::debug!(conn = self.id, "Inbound queue closed");
                break;
            }
        }

        // Dropping the handle closes the writer's queue
        if let Some(handle) = table.lock().remove(&self.id) {
            handle.close();
        }
        if let Some(writer) = self.writer.take() {
            if writer.join().is_err() {
                tracing::error!(conn = self.id, "Writer for {} panicked", self.peer_addr);
            }
        }
    }
}

/// Write queued replies until the queue closes or the socket fails
fn write_loop(id: u64, stream: TcpStream, outbox: Receiver<Vec<Bytes>>) {
    let mut writer = BufWriter::new(stream);
    for frames in outbox.iter() {
        if let Err(e) = write_message(&mut writer, &frames) {
            tracing::debug!(conn = id, "Failed to write response: {}", e);
            let _ = writer.get_ref().shutdown(Shutdown::Both);
            break;
        }
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
            | ErrorKind::NotConnected
    )
}
