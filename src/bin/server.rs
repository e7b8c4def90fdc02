//! Elevator Server Binary
//!
//! Loads the store and serves it over TCP until SIGINT/SIGTERM.

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;

use clap::Parser;
use elevator::config::Config;
use elevator::network::Server;
use elevator::pidfile::PidFile;
use elevator::DbStore;
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use tracing_subscriber::{fmt, EnvFilter};

/// Elevator Server
#[derive(Parser, Debug)]
#[command(name = "elevator-server")]
#[command(about = "Key-value store server multiplexing many databases")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Number of request workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// Root directory of named databases
    #[arg(long)]
    storage_path: Option<PathBuf>,

    /// Store manifest file
    #[arg(long)]
    store_path: Option<PathBuf>,

    /// Database created when no manifest exists
    #[arg(long)]
    default_db: Option<String>,

    /// Pid file to write while running
    #[arg(long)]
    pidfile: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(short, long)]
    log_level: Option<String>,
}

impl Args {
    fn into_config(self) -> elevator::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        if let Some(endpoint) = self.endpoint {
            config.server.endpoint = endpoint;
        }
        if let Some(workers) = self.workers {
            config.server.num_workers = workers;
        }
        if let Some(path) = self.storage_path {
            config.core.storage_path = path;
        }
        if let Some(path) = self.store_path {
            config.core.store_path = path;
        }
        if let Some(name) = self.default_db {
            config.core.default_db = name;
        }
        if let Some(path) = self.pidfile {
            config.server.pidfile = Some(path);
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() {
    let args = Args::parse();
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    tracing::info!("Elevator Server v{}", elevator::VERSION);
    tracing::info!("Storage path: {}", config.core.storage_path.display());
    tracing::info!("Store manifest: {}", config.core.store_path.display());

    if let Err(e) = run(config) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: Config) -> elevator::Result<()> {
    let _pidfile = match &config.server.pidfile {
        Some(path) => Some(PidFile::create(path)?),
        None => None,
    };

    let store = Arc::new(DbStore::initialize(
        config.core.clone(),
        config.storage_engine.clone(),
    )?);
    tracing::info!("Store initialized with {} database(s)", store.len());

    let mut server = Server::new(config.server.clone(), store)?;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let shutdown = server.shutdown_flag();
    thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tracing::info!("Received signal {}, initiating shutdown...", signal);
            shutdown.store(true, Ordering::SeqCst);
        }
    });

    server.run()
}
