//! `archiver` binary.
//!
//! Drains a DynamoDB table into a Kinesis Data Firehose delivery stream, purging every record
//! the stream confirmed, or replays a change-event document through the expiry archiver.

use std::path::PathBuf;
use std::process::ExitCode;

use archiver_config::shared::ArchiverConfig;
use archiver_telemetry::tracing::init_tracing;
use clap::{Parser, Subcommand};
use tracing::error;

use crate::config::load_archiver_config;
use crate::core::{start_archive, start_drain};
use crate::error::{CliError, CliResult};

mod config;
mod core;
mod error;

/// Archives table records to a delivery stream.
#[derive(Parser, Debug)]
#[command(name = "archiver")]
#[command(about = "Archives table records to a delivery stream")]
struct Args {
    /// Source table name, overriding the configured one
    #[arg(long, global = true)]
    table: Option<String>,

    /// Delivery stream name, overriding the configured one
    #[arg(long, global = true)]
    stream: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sends every record of the table to the stream and deletes the confirmed ones
    Drain,
    /// Archives the time-to-live removals of a change-event document
    Archive {
        /// Path to the change-event document
        #[arg(long)]
        events: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", err.render_report());
            ExitCode::FAILURE
        }
    }
}

/// Loads configuration, initializes tracing and runs the selected command on a fresh runtime.
fn run(args: Args) -> CliResult<()> {
    let config = load_archiver_config(args.table, args.stream)?;

    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME")).map_err(CliError::config)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(args.command, config))
}

async fn async_main(command: Command, config: ArchiverConfig) -> CliResult<()> {
    let result = match command {
        Command::Drain => start_drain(config).await,
        Command::Archive { events } => start_archive(config, &events).await,
    };

    if let Err(err) = result {
        error!("{err:#}");
        return Err(CliError::run(err));
    }

    Ok(())
}
