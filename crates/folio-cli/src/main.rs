//! folio - command-line client for the portfolio site API.
//!
//! Logs in against the backend, keeps the session on disk (or in the OS
//! keyring) and exposes the public and admin resources as subcommands.

mod commands;

use std::io;
use std::process::ExitCode;

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use folio_core::{Config, Stores};

/// Directory for an optional log file, in addition to stderr
const LOG_DIR_ENV: &str = "FOLIO_LOG_DIR";

const LOG_FILE_NAME: &str = "folio.log";

/// Initialize the tracing subscriber for logging.
///
/// Returns the file writer guard when file logging is on; it must live until
/// the process exits so buffered lines get flushed.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=folio_core=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();
    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}\n\n{}", message, commands::USAGE);
            return ExitCode::from(2);
        }
    };

    if command == Command::Help {
        println!("{}", commands::USAGE);
        return ExitCode::SUCCESS;
    }

    let (mut config, stores) = match open() {
        Ok(opened) => opened,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!(base_url = stores.api.base_url(), "folio starting");

    match commands::run(command, &stores, &mut config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Store actions report the normalized, user-facing message
            eprintln!("Error: {}", err.detail());
            ExitCode::FAILURE
        }
    }
}

fn open() -> Result<(Config, Stores)> {
    let config = Config::load()?;
    let stores = Stores::open(&config)?;
    Ok((config, stores))
}
