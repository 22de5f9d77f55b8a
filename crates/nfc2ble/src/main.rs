mod adapters;
mod cli;
mod commands;
mod error;
mod output;

use std::fs::OpenOptions;
use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::error::{CliError, exit_code};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match init_tracing(&cli.global) {
        Ok(guard) => {
            let code = match run(&cli).await {
                Ok(()) => exit_code::SUCCESS,
                Err(err) => report(err),
            };
            // Flush the log file before exiting.
            drop(guard);
            code
        }
        Err(err) => report(err),
    };

    // A pending stdin read would otherwise keep the runtime alive.
    std::process::exit(code);
}

fn report(err: CliError) -> i32 {
    let code = err.exit_code();
    eprintln!("{:?}", miette::Report::new(err));
    code
}

/// Log to stderr, and additionally to `--log-file` when given. `RUST_LOG`
/// overrides the verbosity flags.
fn init_tracing(global: &GlobalOpts) -> Result<Option<WorkerGuard>, CliError> {
    let verbosity = if global.debug {
        global.verbose.max(2)
    } else {
        global.verbose
    };
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match global.log_file {
        Some(ref path) => {
            let (writer, guard) = tracing_appender::non_blocking(open_log_file(path)?);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .init();

    Ok(guard)
}

fn open_log_file(path: &Path) -> Result<std::fs::File, CliError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| CliError::LogFile {
            path: path.display().to_string(),
            source,
        })
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Run(args) => commands::run::handle(args, &cli.global).await,
        Command::Check(args) => commands::check::handle(args, &cli.global),
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "nfc2ble", &mut std::io::stdout());
            Ok(())
        }
    }
}
