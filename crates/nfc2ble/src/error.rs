//! CLI error types with miette diagnostics.
//!
//! Maps core and config errors into user-facing errors with help text
//! and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use nfc2ble_config::ConfigError;
use nfc2ble_core::CoreError;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    /// `EX_CONFIG` from sysexits.h.
    pub const CONFIG: i32 = 78;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Identifier file ──────────────────────────────────────────────
    #[error("Identifier file not found: {path}")]
    #[diagnostic(
        code(nfc2ble::id_file_not_found),
        help(
            "Create it with one `<nfc id>,<tag id>` record per line,\n\
             or point at an existing file with --id-file."
        )
    )]
    IdFileNotFound { path: String },

    #[error("Cannot read identifier file {path}")]
    #[diagnostic(code(nfc2ble::id_file_read))]
    IdFileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(nfc2ble::validation))]
    Validation { field: String, reason: String },

    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(nfc2ble::no_config),
        help("Print a starting point with: nfc2ble config --default")
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(nfc2ble::config))]
    Config(Box<figment::Error>),

    #[error("Failed to render configuration: {message}")]
    #[diagnostic(code(nfc2ble::render))]
    Render { message: String },

    // ── Runtime ──────────────────────────────────────────────────────
    #[error("NFC reader failed: {message}")]
    #[diagnostic(code(nfc2ble::reader))]
    Reader { message: String },

    #[error("Cannot open log file {path}")]
    #[diagnostic(code(nfc2ble::log_file))]
    LogFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(nfc2ble::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::IdFileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoConfig { .. } | Self::Config(_) => exit_code::CONFIG,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Error mapping ────────────────────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::IdFileNotFound { path } => Self::IdFileNotFound {
                path: path.display().to_string(),
            },
            CoreError::IdFileRead { path, source } => Self::IdFileRead {
                path: path.display().to_string(),
                source,
            },
            CoreError::InvalidConfig { field, reason } => Self::Validation { field, reason },
            CoreError::Reader { message } => Self::Reader { message },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Serialization(e) => Self::Render {
                message: e.to_string(),
            },
            ConfigError::Figment(e) => Self::Config(e),
        }
    }
}
