//! Network Module
//!
//! Transport over TCP with router-socket semantics.
//!
//! ## Architecture
//! - Single acceptor thread
//! - One reader thread per connection, prefixing each message with the
//!   connection's identity frame
//! - Worker pool consuming the shared inbound queue
//! - Relay thread routing responses by identity to a per-connection writer
//!   thread; a connection whose reply queue overflows is closed

mod connection;
mod server;

use std::collections::HashMap;

use parking_lot::Mutex;

pub use connection::{identity_frame, parse_identity, Connection, ReplyHandle, OUTBOUND_CAPACITY};
pub use server::{Server, INBOUND_CAPACITY};

/// Writing side of every open connection, keyed by identity
pub type ConnectionTable = Mutex<HashMap<u64, ReplyHandle>>;
