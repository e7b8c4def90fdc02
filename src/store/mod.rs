//! Store Module
//!
//! Logical databases and the registry that owns them.
//!
//! ## Components
//! - **Database**: per-database handle; while mounted it serializes every
//!   operation through one processing loop
//! - **DbStore**: registry of handles, the name index and the manifest
//! - **Batch**: parsing of BATCH argument streams

mod batch;
mod database;
mod registry;

pub use batch::{batch_args, parse_batch_args, BatchOperation};
pub use database::{Database, DbOperation, DbQueue, DbResult, MountStatus, QUEUE_CAPACITY};
pub use registry::{is_file_path, DbStore};
