//! Elevator CLI Client
//!
//! Command-line interface for interacting with an Elevator server.

use std::io::{self, BufRead, Write};

use clap::{Parser, Subcommand};
use elevator::protocol::{DbTarget, Request, Response};
use elevator::store::BatchOperation;
use elevator::Client;

/// Elevator CLI
#[derive(Parser, Debug)]
#[command(name = "elevator-cli")]
#[command(about = "CLI for the Elevator key-value store")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:4141")]
    server: String,

    /// Database addressed by database commands
    #[arg(short, long, default_value = "default")]
    db: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a database
    Create { name: String },

    /// Drop a database and delete its storage
    Drop { name: String },

    /// Print the identifier of a database
    Connect { name: String },

    /// Mount a database
    Mount { name: String },

    /// Unmount a database
    Unmount { name: String },

    /// List databases
    List,

    /// Get a value by key
    Get { key: String },

    /// Set a key-value pair
    Put { key: String, value: String },

    /// Delete a key
    Delete { key: String },

    /// Get several values at once
    Mget {
        #[arg(required = true)]
        keys: Vec<String>,
    },

    /// Pairs with start <= key < end
    Range { start: String, end: String },

    /// Up to `limit` pairs from the first key >= start
    Slice { start: String, limit: usize },

    /// Atomic batch of `put:key=value` and `delete:key` entries
    Batch {
        #[arg(required = true)]
        entries: Vec<String>,
    },

    /// Read request lines from stdin and print each response
    Shell,
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };
    client.set_target(DbTarget::Name(args.db.clone()));

    let result = match args.command {
        Commands::Shell => shell(&mut client),
        command => execute(&mut client, command).map(|response| print_response(&response)),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn execute(client: &mut Client, command: Commands) -> elevator::Result<Response> {
    match command {
        Commands::Create { name } => client.create(&name),
        Commands::Drop { name } => client.drop_db(&name),
        Commands::Connect { name } => client.connect_db(&name),
        Commands::Mount { name } => client.mount(&name),
        Commands::Unmount { name } => client.unmount(&name),
        Commands::List => client.list(),
        Commands::Get { key } => client.get(key.as_bytes()),
        Commands::Put { key, value } => client.put(key.as_bytes(), value.as_bytes()),
        Commands::Delete { key } => client.delete(key.as_bytes()),
        Commands::Mget { keys } => {
            let keys: Vec<&[u8]> = keys.iter().map(|k| k.as_bytes()).collect();
            client.mget(&keys)
        }
        Commands::Range { start, end } => client.range(start.as_bytes(), end.as_bytes()),
        Commands::Slice { start, limit } => client.slice(start.as_bytes(), limit),
        Commands::Batch { entries } => {
            let operations = entries
                .iter()
                .map(|e| parse_batch_entry(e))
                .collect::<elevator::Result<Vec<_>>>()?;
            client.batch(&operations)
        }
        Commands::Shell => Err(elevator::ElevatorError::Request(
            "shell cannot be nested".to_string(),
        )),
    }
}

/// `put:key=value` or `delete:key`
fn parse_batch_entry(entry: &str) -> elevator::Result<BatchOperation> {
    if let Some(rest) = entry.strip_prefix("put:") {
        if let Some((key, value)) = rest.split_once('=') {
            return Ok(BatchOperation::Put {
                key: key.as_bytes().to_vec(),
                value: value.as_bytes().to_vec(),
            });
        }
    } else if let Some(key) = entry.strip_prefix("delete:") {
        return Ok(BatchOperation::Delete {
            key: key.as_bytes().to_vec(),
        });
    }
    Err(elevator::ElevatorError::Request(format!(
        "Invalid batch entry {:?}, expected put:key=value or delete:key",
        entry
    )))
}

/// Interactive mode: one request per line, `USE name` switches database
fn shell(client: &mut Client) -> elevator::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(name) = line
            .strip_prefix("USE ")
            .or_else(|| line.strip_prefix("use "))
        {
            let response = client.use_database(name.trim())?;
            println!("{}\n", response);
            continue;
        }

        match Request::from_line(line, client.target().cloned()) {
            Ok(request) => {
                let response = client.request(&request)?;
                println!("{}\n", response);
            }
            Err(e) => println!("{}\n", e),
        }
        stdout.flush()?;
    }
    Ok(())
}

fn print_response(response: &Response) {
    if !response.is_success() {
        println!("({:?}) {}", response.status, response.err_msg);
        return;
    }
    if response.data.is_empty() {
        println!("OK");
    }
    for value in &response.data {
        println!("{}", String::from_utf8_lossy(value));
    }
}
