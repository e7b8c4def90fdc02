//! Worker Pool
//!
//! A fixed set of worker threads sharing one inbound queue of raw multi-part
//! messages. Each worker decodes the payload, dispatches it through the
//! [`Router`] and emits the encoded response, return address first, on the
//! outbound queue relayed by the transport.
//!
//! ## Shutdown
//! Dropping the exit sender is the broadcast signal: every worker finishes
//! the request it is processing, drops its outbound sender and exits.
//! [`WorkerPool::shutdown`] returns once all workers are joined.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{self, select, Receiver, Sender};

use crate::error::{ElevatorError, Result};
use crate::protocol::{decode_request, encode_response, Response};
use crate::router::Router;

/// Pool of request workers
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    exit: Option<Sender<()>>,
}

impl WorkerPool {
    /// Spawn `num_workers` workers
    ///
    /// Workers read raw messages from `inbound` and write responses to
    /// `outbound`. Both queues stay open after the pool exits only if other
    /// endpoints still hold them.
    pub fn start(
        num_workers: usize,
        router: Arc<Router>,
        inbound: Receiver<Vec<Bytes>>,
        outbound: Sender<Vec<Bytes>>,
    ) -> Result<Self> {
        let (exit, exit_signal) = channel::bounded::<()>(0);

        let mut workers = Vec::with_capacity(num_workers);
        for id in 0..num_workers {
            let router = Arc::clone(&router);
            let inbound = inbound.clone();
            let outbound = outbound.clone();
            let exit_signal = exit_signal.clone();

            let handle = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker_loop(id, router, inbound, outbound, exit_signal))
                .map_err(|e| ElevatorError::Network(format!("Failed to spawn worker: {}", e)))?;
            workers.push(handle);
        }

        tracing::info!("Started {} workers", num_workers);
        Ok(Self {
            workers,
            exit: Some(exit),
        })
    }

    /// Number of running workers
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Signal every worker to exit and wait for all of them
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // Closing the exit channel wakes every worker at once
        drop(self.exit.take());

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("Worker panicked");
            }
        }
        tracing::info!("All workers stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

fn worker_loop(
    id: usize,
    router: Arc<Router>,
    inbound: Receiver<Vec<Bytes>>,
    outbound: Sender<Vec<Bytes>>,
    exit: Receiver<()>,
) {
    tracing::debug!("Worker {} started", id);

    loop {
        select! {
            recv(inbound) -> message => {
                let Ok(frames) = message else { break };
                if let Some(reply) = process_message(&router, frames) {
                    if outbound.send(reply).is_err() {
                        tracing::warn!("Worker {}: outbound queue closed", id);
                        break;
                    }
                }
            }
            recv(exit) -> _ => break,
        }
    }

    tracing::debug!("Worker {} exiting", id);
}

/// Handle one raw message: decode, dispatch, encode
///
/// The last frame is the payload, every frame before it the return address.
/// Returns `None` when no reply can be addressed or encoded.
pub fn process_message(router: &Router, mut frames: Vec<Bytes>) -> Option<Vec<Bytes>> {
    let Some(payload) = frames.pop() else {
        tracing::warn!("Dropping message without frames");
        return None;
    };
    let id = frames;

    let response = match decode_request(&payload) {
        Ok(mut request) => {
            request.id = id;
            router.handle(request)
        }
        Err(e) => {
            tracing::warn!("Malformed request: {}", e);
            let e = ElevatorError::Request(format!("Malformed request: {}", e));
            Response::from_error(id, &e)
        }
    };

    match encode_response(&response) {
        Ok(payload) => {
            let mut reply = response.id;
            reply.push(Bytes::from(payload));
            Some(reply)
        }
        Err(e) => {
            tracing::error!("Failed to encode response: {}", e);
            None
        }
    }
}
