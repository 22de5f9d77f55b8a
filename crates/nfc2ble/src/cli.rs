//! Clap derive structures for the `nfc2ble` CLI.
//!
//! Also compiled by `build.rs` for man page generation, so this module
//! may only depend on clap, clap_complete and humantime.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// nfc2ble -- publish a rotating BLE tag id for every NFC tap
#[derive(Debug, Parser)]
#[command(
    name = "nfc2ble",
    version,
    about = "Bridge NFC tag taps to bounded BLE tag advertisements",
    long_about = "Reads NFC tag events and advertises a BLE tag identifier for each tap.\n\n\
        Every NFC id maps to one or more BLE tag ids (id.csv); consecutive taps\n\
        rotate through them. Only one advertisement is live at a time: a new tap\n\
        stops the running one first.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Debug logging (same as -vv)
    #[arg(long, short = 'd', global = true)]
    pub debug: bool,

    /// Config file (default: platform config dir)
    #[arg(long, env = "NFC2BLE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

// ── Shared enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default)
    Table,
    /// Pretty-printed JSON
    Json,
    /// One NFC id per line
    Plain,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PublisherArg {
    /// Log start/stop without touching the radio
    Log,
    /// Run the configured start/stop shell commands
    Command,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the bridge, reading tag events from stdin
    #[command(long_about = "Run the bridge, reading tag events from stdin.\n\n\
        One event per line: `<id>` or `+<id>` is a tag entering the field,\n\
        `-<id>` a tag leaving it. Blank lines and lines starting with '#'\n\
        are ignored. Stops at end of input or on Ctrl-C / SIGTERM.")]
    Run(RunArgs),

    /// Load the identifier file and print the mapping
    Check(CheckArgs),

    /// Print the effective configuration as TOML
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct IdArgs {
    /// Identifier file (skips the ., $HOME, /etc search)
    #[arg(long, value_name = "PATH")]
    pub id_file: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub ids: IdArgs,

    /// Publisher backend
    #[arg(long)]
    pub publisher: Option<PublisherArg>,

    /// Start command for the `command` publisher; `{tag}` is substituted
    #[arg(long, value_name = "CMD")]
    pub start_command: Option<String>,

    /// Stop command for the `command` publisher
    #[arg(long, value_name = "CMD")]
    pub stop_command: Option<String>,

    /// Longest a single advertisement may run (e.g. 60s)
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub max_duration: Option<Duration>,

    /// How often a running advertisement checks for cancellation
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub tick_interval: Option<Duration>,

    /// How long a new tap waits for the previous advertisement to stop
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub settle_delay: Option<Duration>,

    /// How long shutdown waits for the active advertisement
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub shutdown_drain: Option<Duration>,

    /// Skip the publisher on/off cycle at startup
    #[arg(long)]
    pub no_reset: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub ids: IdArgs,

    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Print built-in defaults instead of the loaded configuration
    #[arg(long)]
    pub default: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
