//! Request Router
//!
//! Classifies a request by its command tag and dispatches it:
//! - store commands run synchronously against the [`DbStore`] on the
//!   calling thread
//! - database commands are validated, then handed to the target database's
//!   processing loop (mounting it on demand) and awaited
//!
//! Store handlers live in a dispatch table keyed by [`StoreCommand`], so a new
//! command only needs a handler and a table entry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ElevatorError, Result};
use crate::protocol::{CommandKind, DbCommand, Request, Response, StoreCommand};
use crate::store::{DbOperation, DbStore};

/// Handler of one store command
pub type StoreHandler = fn(&DbStore, &Request) -> Result<Vec<Vec<u8>>>;

/// Classify a request's command tag
///
/// Unknown and empty tags fail here and never reach the store.
pub fn classify(request: &Request) -> Result<CommandKind> {
    request.kind()
}

/// Dispatches requests against one [`DbStore`]
pub struct Router {
    store: Arc<DbStore>,
    store_handlers: HashMap<StoreCommand, StoreHandler>,
}

impl Router {
    pub fn new(store: Arc<DbStore>) -> Self {
        let mut store_handlers: HashMap<StoreCommand, StoreHandler> = HashMap::new();
        store_handlers.insert(StoreCommand::Create, handle_create);
        store_handlers.insert(StoreCommand::Drop, handle_drop);
        store_handlers.insert(StoreCommand::Connect, handle_connect);
        store_handlers.insert(StoreCommand::Mount, handle_mount);
        store_handlers.insert(StoreCommand::Unmount, handle_unmount);
        store_handlers.insert(StoreCommand::List, handle_list);

        Self {
            store,
            store_handlers,
        }
    }

    /// Run a request and return its result values
    pub fn dispatch(&self, request: &Request) -> Result<Vec<Vec<u8>>> {
        match classify(request)? {
            CommandKind::Store(command) => {
                tracing::debug!("Store command {}", command.as_str());
                let handler = self
                    .store_handlers
                    .get(&command)
                    .ok_or_else(|| ElevatorError::UnknownCommand(request.command.clone()))?;
                handler(&self.store, request)
            }
            CommandKind::Database(command) => self.dispatch_database(command, request),
        }
    }

    /// Run a request and build the response addressed back to its sender
    pub fn handle(&self, request: Request) -> Response {
        match self.dispatch(&request) {
            Ok(data) => Response::ok(request.id, data),
            Err(e) => {
                tracing::debug!("{} failed: {}", request, e);
                Response::from_error(request.id, &e)
            }
        }
    }

    pub fn store(&self) -> &Arc<DbStore> {
        &self.store
    }

    fn dispatch_database(&self, command: DbCommand, request: &Request) -> Result<Vec<Vec<u8>>> {
        let target = request.target.as_ref().ok_or_else(|| {
            ElevatorError::Request(format!("{} requires a target database", command.as_str()))
        })?;
        let operation = DbOperation::parse(command, &request.args)?;

        let queue = self.store.queue_for(target)?;
        tracing::debug!(db = ?target, "Database command {}", command.as_str());
        queue.call(operation)
    }
}

// =============================================================================
// Store Handlers
// =============================================================================

/// The single database name argument of a store command
fn db_name(request: &Request) -> Result<&str> {
    match request.args.as_slice() {
        [name] => std::str::from_utf8(name)
            .map_err(|_| ElevatorError::Request("Database name is not valid UTF-8".to_string())),
        args => Err(ElevatorError::Request(format!(
            "{} expects a database name, got {} argument(s)",
            request.command,
            args.len()
        ))),
    }
}

fn handle_create(store: &DbStore, request: &Request) -> Result<Vec<Vec<u8>>> {
    store.create(db_name(request)?)?;
    Ok(Vec::new())
}

fn handle_drop(store: &DbStore, request: &Request) -> Result<Vec<Vec<u8>>> {
    store.drop_db(db_name(request)?)?;
    Ok(Vec::new())
}

fn handle_connect(store: &DbStore, request: &Request) -> Result<Vec<Vec<u8>>> {
    let uid = store.connect(db_name(request)?)?;
    Ok(vec![uid.into_bytes()])
}

fn handle_mount(store: &DbStore, request: &Request) -> Result<Vec<Vec<u8>>> {
    let uid = store.connect(db_name(request)?)?;
    store.mount(&uid)?;
    Ok(Vec::new())
}

fn handle_unmount(store: &DbStore, request: &Request) -> Result<Vec<Vec<u8>>> {
    let uid = store.connect(db_name(request)?)?;
    store.unmount(&uid)?;
    Ok(Vec::new())
}

fn handle_list(store: &DbStore, _request: &Request) -> Result<Vec<Vec<u8>>> {
    Ok(store.list().into_iter().map(String::into_bytes).collect())
}
