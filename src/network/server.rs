//! TCP Server
//!
//! Accepts connections, feeds their messages to the worker pool and relays
//! responses back to the connection named by each response's identity frame.
//!
//! ## Threads
//! ```text
//!   acceptor ──▶ reader (per connection) ──▶ inbound ──▶ workers
//!                                                          │
//!   client ◀── writer ◀── relay ◀── outbound ◀─────────────┘
//! ```

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use crossbeam::channel::{self, Receiver, TrySendError};
use parking_lot::Mutex;

use super::connection::{parse_identity, Connection};
use super::ConnectionTable;
use crate::config::ServerConfig;
use crate::error::{ElevatorError, Result};
use crate::router::Router;
use crate::store::DbStore;
use crate::worker::WorkerPool;

/// Capacity of the queue between connection readers and workers
pub const INBOUND_CAPACITY: usize = 1024;

/// How often the acceptor checks for shutdown while idle
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// TCP server for Elevator
pub struct Server {
    config: ServerConfig,
    store: Arc<DbStore>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    next_id: AtomicU64,
}

impl Server {
    /// Bind the listen address
    ///
    /// Binding failure is fatal to the caller.
    pub fn new(config: ServerConfig, store: Arc<DbStore>) -> Result<Self> {
        let listener = TcpListener::bind(&config.endpoint).map_err(|e| {
            ElevatorError::Network(format!("Cannot bind {}: {}", config.endpoint, e))
        })?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            store,
            listener,
            local_addr,
            shutdown: Arc::new(AtomicBool::new(false)),
            next_id: AtomicU64::new(1),
        })
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Flag that stops the server once set; can be handed to signal handlers
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Serve until shutdown is requested (blocking)
    ///
    /// On shutdown: stop accepting and close every connection, drain and join
    /// the workers, stop the relay, then unmount every database.
    pub fn run(&mut self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        let connections: Arc<ConnectionTable> = Arc::new(Mutex::new(HashMap::new()));
        let (inbound_tx, inbound_rx) = channel::bounded(INBOUND_CAPACITY);
        let (outbound_tx, outbound_rx) = channel::unbounded();

        let router = Arc::new(Router::new(Arc::clone(&self.store)));
        let pool = WorkerPool::start(self.config.num_workers, router, inbound_rx, outbound_tx)?;

        let relay = {
            let connections = Arc::clone(&connections);
            thread::Builder::new()
                .name("relay".to_string())
                .spawn(move || relay_loop(outbound_rx, connections))
                .map_err(|e| ElevatorError::Network(format!("Failed to spawn relay: {}", e)))?
        };

        let mut readers: Vec<JoinHandle<()>> = Vec::new();
        while !self.shutdown.load(Ordering::SeqCst) {
            match self.listener.accept() {
                Ok((stream, addr)) => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let conn = match Connection::register(id, stream, &connections) {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                            continue;
                        }
                    };

                    let inbound = inbound_tx.clone();
                    let table = Arc::clone(&connections);
                    match thread::Builder::new()
                        .name(format!("conn-{}", id))
                        .spawn(move || conn.handle(inbound, table))
                    {
                        Ok(handle) => readers.push(handle),
                        Err(e) => {
                            tracing::error!("Failed to spawn reader for {}: {}", addr, e);
                            if let Some(handle) = connections.lock().remove(&id) {
                                handle.close();
                            }
                        }
                    }
                    readers.retain(|h| !h.is_finished());
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        tracing::info!("Shutting down server");

        // Closing the sockets unblocks every reader
        for (_, handle) in connections.lock().drain() {
            handle.close();
        }
        for handle in readers {
            let _ = handle.join();
        }
        drop(inbound_tx);

        pool.shutdown();
        // Workers held the last outbound senders
        if relay.join().is_err() {
            tracing::error!("Relay panicked");
        }

        self.store.unmount_all();
        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Route every response to its connection (first frame = identity)
///
/// Only queues replies; the socket writes happen on each connection's own
/// writer thread. A connection that has stopped reading and filled its
/// queue is closed.
fn relay_loop(outbound: Receiver<Vec<Bytes>>, connections: Arc<ConnectionTable>) {
    for mut frames in outbound.iter() {
        if frames.len() < 2 {
            tracing::warn!("Dropping response without return address");
            continue;
        }
        let identity = frames.remove(0);
        let Some(id) = parse_identity(&identity) else {
            tracing::warn!("Dropping response with malformed identity");
            continue;
        };

        let mut table = connections.lock();
        let Some(handle) = table.get(&id) else {
            tracing::debug!(conn = id, "Dropping response for closed connection");
            continue;
        };
        match handle.try_send(frames) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn = id, "Reply queue full, closing stalled connection");
                if let Some(handle) = table.remove(&id) {
                    handle.close();
                }
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(conn = id, "Writer gone, dropping connection");
                if let Some(handle) = table.remove(&id) {
                    handle.close();
                }
            }
        }
    }
    tracing::debug!("Relay exiting");
}
