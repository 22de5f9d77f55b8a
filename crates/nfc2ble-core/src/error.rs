// ── Core error types ──
//
// Errors surfaced by nfc2ble-core. Steady-state failures (lookup misses,
// publisher hiccups) are recovered inside the session and dispatcher and
// never show up here; only startup problems propagate to the entry point.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Identifier file ──────────────────────────────────────────────
    #[error("Identifier file not found: {path}")]
    IdFileNotFound { path: PathBuf },

    #[error("Cannot read identifier file {path}: {source}")]
    IdFileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: String, reason: String },

    // ── Reader ───────────────────────────────────────────────────────
    #[error("NFC reader failed: {message}")]
    Reader { message: String },
}

/// Failure reported by a [`BlePublisher`](crate::port::BlePublisher).
///
/// Publish failures are logged by the owning session and never retried;
/// the next NFC tap gets a fresh attempt.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("advertisement start rejected: {0}")]
    Start(String),

    #[error("advertisement stop failed: {0}")]
    Stop(String),

    #[error("publisher I/O error: {0}")]
    Io(#[from] std::io::Error),
}
