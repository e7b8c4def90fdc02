//! Batch operations
//!
//! A BATCH request carries a flat argument stream in which every entry is
//! tagged by a signal:
//!
//! ```text
//! BATCH-PUT key value BATCH-DELETE key BATCH-PUT key value ...
//! ```
//!
//! The parsed operations keep the stream order; the engine applies them in
//! that order inside one atomic write, so a later entry for a key wins.

use crate::error::{ElevatorError, Result};
use crate::protocol::{SIGNAL_BATCH_DELETE, SIGNAL_BATCH_PUT};

/// One entry of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Parse a BATCH argument stream into ordered operations
pub fn parse_batch_args(args: &[Vec<u8>]) -> Result<Vec<BatchOperation>> {
    let mut operations = Vec::new();
    let mut rest = args;

    while let Some((signal, tail)) = rest.split_first() {
        match signal.as_slice() {
            s if s == SIGNAL_BATCH_PUT.as_bytes() => match tail {
                [key, value, tail @ ..] => {
                    operations.push(BatchOperation::Put {
                        key: key.clone(),
                        value: value.clone(),
                    });
                    rest = tail;
                }
                _ => {
                    return Err(ElevatorError::Request(format!(
                        "Not enough arguments after {} at entry {}",
                        SIGNAL_BATCH_PUT,
                        operations.len()
                    )))
                }
            },
            s if s == SIGNAL_BATCH_DELETE.as_bytes() => match tail {
                [key, tail @ ..] => {
                    operations.push(BatchOperation::Delete { key: key.clone() });
                    rest = tail;
                }
                _ => {
                    return Err(ElevatorError::Request(format!(
                        "Not enough arguments after {} at entry {}",
                        SIGNAL_BATCH_DELETE,
                        operations.len()
                    )))
                }
            },
            other => {
                return Err(ElevatorError::Request(format!(
                    "Unknown batch signal {:?}",
                    String::from_utf8_lossy(other)
                )))
            }
        }
    }

    Ok(operations)
}

/// Flatten operations back into a BATCH argument stream
pub fn batch_args(operations: &[BatchOperation]) -> Vec<Vec<u8>> {
    let mut args = Vec::new();
    for operation in operations {
        match operation {
            BatchOperation::Put { key, value } => {
                args.push(SIGNAL_BATCH_PUT.as_bytes().to_vec());
                args.push(key.clone());
                args.push(value.clone());
            }
            BatchOperation::Delete { key } => {
                args.push(SIGNAL_BATCH_DELETE.as_bytes().to_vec());
                args.push(key.clone());
            }
        }
    }
    args
}
