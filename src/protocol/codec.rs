//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Message (multi-part)
//! ```text
//! ┌────────────┬──────────┬─────────────┬──────────┬─────────────┬─────┐
//! │ Frames (4) │ Len (4)  │   Frame 0   │ Len (4)  │   Frame 1   │ ... │
//! └────────────┴──────────┴─────────────┴──────────┴─────────────┴─────┘
//! ```
//!
//! The last frame of a message is the payload; every frame before it is an
//! envelope (return address) that the server echoes back untouched.
//!
//! ### Payload
//! A bincode encoded [`Request`] or [`Response`].

use std::io::{Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{Request, Response};
use crate::error::{ElevatorError, Result};

/// Frame count / frame length prefix size
pub const LEN_SIZE: usize = 4;

/// Maximum frame size (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Maximum number of frames in one message
pub const MAX_FRAMES: u32 = 64;

// =============================================================================
// Payload Encoding/Decoding
// =============================================================================

/// Encode a request payload (the return address is not encoded)
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    Ok(bincode::serialize(request)?)
}

/// Decode a request payload
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    Ok(bincode::deserialize(bytes)?)
}

/// Encode a response payload (the return address is not encoded)
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    Ok(bincode::serialize(response)?)
}

/// Decode a response payload
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    Ok(bincode::deserialize(bytes)?)
}

// =============================================================================
// Message Framing
// =============================================================================

/// Encode a multi-part message to bytes
///
/// Format: frame_count (4) + (frame_len (4) + frame)*
pub fn encode_message(frames: &[Bytes]) -> Bytes {
    let total: usize = frames.iter().map(|f| LEN_SIZE + f.len()).sum();
    let mut buf = BytesMut::with_capacity(LEN_SIZE + total);
    buf.put_u32(frames.len() as u32);
    for frame in frames {
        buf.put_u32(frame.len() as u32);
        buf.put_slice(frame);
    }
    buf.freeze()
}

/// Decode a multi-part message from bytes
pub fn decode_message(bytes: &[u8]) -> Result<Vec<Bytes>> {
    let mut cursor = bytes;
    let message = read_message(&mut cursor)?;
    if !cursor.is_empty() {
        return Err(ElevatorError::Protocol(format!(
            "Trailing data after message: {} bytes",
            cursor.len()
        )));
    }
    Ok(message)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a complete multi-part message from a stream
///
/// Blocks until a complete message is received or an error occurs
pub fn read_message<R: Read>(reader: &mut R) -> Result<Vec<Bytes>> {
    let frame_count = read_u32(reader)?;

    if frame_count == 0 {
        return Err(ElevatorError::Protocol("Empty message".to_string()));
    }
    if frame_count > MAX_FRAMES {
        return Err(ElevatorError::Protocol(format!(
            "Too many frames: {} (max {})",
            frame_count, MAX_FRAMES
        )));
    }

    let mut frames = Vec::with_capacity(frame_count as usize);
    for _ in 0..frame_count {
        let frame_len = read_u32(reader)?;

        // Validate frame length
        if frame_len > MAX_FRAME_SIZE {
            return Err(ElevatorError::Protocol(format!(
                "Frame too large: {} bytes (max {})",
                frame_len, MAX_FRAME_SIZE
            )));
        }

        let mut frame = vec![0u8; frame_len as usize];
        if frame_len > 0 {
            reader.read_exact(&mut frame)?;
        }
        frames.push(Bytes::from(frame));
    }

    Ok(frames)
}

/// Write a multi-part message to a stream
pub fn write_message<W: Write>(writer: &mut W, frames: &[Bytes]) -> Result<()> {
    let bytes = encode_message(frames);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a big-endian length prefix
fn read_u32<R: Read>(reader: &mut R) -> Result<u32> {
    let mut buf = [0u8; LEN_SIZE];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}
