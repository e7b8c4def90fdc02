//! # Elevator
//!
//! A networked key-value server multiplexing many embedded databases behind
//! one endpoint:
//! - Per-database processing loop serializing all access to its engine
//! - Registry of named databases persisted in a JSON manifest
//! - Worker pool dispatching framed requests
//! - TCP transport with router-socket style return addresses
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                             │
//! │        (acceptor, per-connection readers, relay)            │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ identity-prefixed messages
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Worker Pool                              │
//! │              (decode → route → encode)                      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Request Router                             │
//! └──────────┬───────────────────────────────┬──────────────────┘
//!            │ store commands                │ database commands
//!            ▼                               ▼
//!   ┌─────────────────┐   queue    ┌──────────────────────┐
//!   │     DbStore     │──────────▶ │  Database (mounted)  │
//!   │ (Mutex, JSON    │            │  processing loop     │
//!   │  manifest)      │            └──────────┬───────────┘
//!   └─────────────────┘                       ▼
//!                                      ┌─────────────┐
//!                                      │   Engine    │
//!                                      │   (redb)    │
//!                                      └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod engine;
pub mod store;
pub mod router;
pub mod worker;
pub mod network;
pub mod protocol;
pub mod client;
pub mod pidfile;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{ElevatorError, Result};
pub use config::Config;
pub use engine::Engine;
pub use store::{Database, DbStore};
pub use router::Router;
pub use worker::WorkerPool;
pub use client::Client;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Elevator
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
