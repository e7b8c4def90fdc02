//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Message Format
//! ```text
//! ┌────────────┬──────────────────────────┬──────────────────────┐
//! │ Frames (4) │ Envelope frames (0..n)   │ Payload frame        │
//! └────────────┴──────────────────────────┴──────────────────────┘
//! ```
//!
//! ### Store Commands
//! - CREATE name, DROP name, CONNECT name, MOUNT name, UNMOUNT name, LIST
//!
//! ### Database Commands
//! - GET key, PUT key value, DELETE key, MGET key..., RANGE start end,
//!   SLICE start limit, BATCH (BATCH-PUT key value | BATCH-DELETE key)*
//!
//! ### Status Codes
//! - 0x00: SUCCESS
//! - 0x01..0x0e: one code per error kind (see [`Status`])

mod command;
mod response;
mod codec;

pub use command::{
    CommandKind, DbCommand, DbTarget, Request, StoreCommand, DB_BATCH, DB_CONNECT, DB_CREATE,
    DB_DELETE, DB_DROP, DB_GET, DB_LIST, DB_MGET, DB_MOUNT, DB_PUT, DB_RANGE, DB_SLICE,
    DB_UMOUNT, SIGNAL_BATCH_DELETE, SIGNAL_BATCH_PUT,
};
pub use response::{Response, Status};
pub use codec::{
    decode_message, decode_request, decode_response, encode_message, encode_request,
    encode_response, read_message, write_message, MAX_FRAMES, MAX_FRAME_SIZE,
};
