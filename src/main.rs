//! CNP Bank Server CLI
//!
//! Binds a TCP listener, serves the CNP banking protocol until SIGINT or
//! SIGTERM, then persists the account and transaction tables.
//!
//! # Usage
//!
//! ```bash
//! cnp-server --port 9000
//! cnp-server --port 9000 --data-dir /var/lib/cnp --recv-timeout-ms 250
//! cnp-server            # prompts for the port on stdin
//! ```
//!
//! # Exit Codes
//!
//! - 0: clean shutdown, tables saved
//! - 1: startup failure or a failed shutdown save

use cnp_server::cli;
use cnp_server::core::{AccountStore, Engine, TransactionLog};
use cnp_server::io::Storage;
use cnp_server::net::{Server, ServerConfig};
use cnp_server::types::ServerError;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::parse_args();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: cli::CliArgs) -> Result<(), ServerError> {
    let port = args.resolve_port()?;

    // SIGINT/SIGTERM raise the flag; the accept loop polls it
    let terminate = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        signal_hook::flag::register(signal, terminate.clone())
            .map_err(ServerError::startup)?;
    }

    let storage = Storage::new(&args.data_dir);
    let engine = Arc::new(Engine::new(
        AccountStore::from_records(load_or_empty(storage.load_accounts(), "account")),
        TransactionLog::from_records(load_or_empty(storage.load_transactions(), "transaction")),
    ));
    info!(
        accounts = engine.accounts().len(),
        transactions = engine.transactions().len(),
        "stores ready"
    );

    let server = Server::bind(&ServerConfig {
        port,
        recv_timeout: Duration::from_millis(args.recv_timeout_ms),
    })?;
    server.serve(engine.clone(), terminate)?;

    // workers have joined; nothing mutates the stores past this point
    storage.save_accounts(&engine.accounts().snapshot())?;
    storage.save_transactions(&engine.transactions().snapshot())?;
    info!("shutdown complete");
    Ok(())
}

/// A table that fails to load starts empty rather than blocking startup
fn load_or_empty<T>(result: Result<Vec<T>, ServerError>, table: &str) -> Vec<T> {
    result.unwrap_or_else(|error| {
        warn!(table, %error, "failed to load table, starting empty");
        Vec::new()
    })
}
