// ── Runtime bridge configuration ──
//
// These types describe *how* the bridge times its publish sessions and
// where it looks for the identifier file. They never touch disk: the
// binary builds a `BridgeConfig` (via nfc2ble-config) and hands it in.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// File name searched for when no explicit identifier file is given.
pub const DEFAULT_ID_FILE: &str = "id.csv";

/// Tag advertised by the startup reset cycle.
pub const RESET_TAG_ID: &str = "dummy";

/// Where to find the NFC → BLE identifier mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSource {
    /// Search `dirs` in order for `file_name`; first hit wins.
    Search {
        file_name: String,
        dirs: Vec<PathBuf>,
    },
    /// Use exactly this file. Missing is an error.
    Explicit(PathBuf),
}

impl Default for IdSource {
    fn default() -> Self {
        Self::Search {
            file_name: DEFAULT_ID_FILE.into(),
            dirs: default_search_dirs(),
        }
    }
}

/// Current directory, then `$HOME`, then `/etc`.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(".")];
    if let Some(home) = std::env::var_os("HOME") {
        dirs.push(PathBuf::from(home));
    }
    dirs.push(PathBuf::from("/etc"));
    dirs
}

/// Timing and discovery settings for a [`Bridge`](crate::Bridge).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Identifier file location.
    pub id_source: IdSource,
    /// Upper bound on a single publish session.
    pub max_duration: Duration,
    /// How often a running session checks for cancellation.
    pub tick_interval: Duration,
    /// How long `admit` waits for the previous session to acknowledge its stop.
    pub settle_delay: Duration,
    /// How long shutdown waits for the active session before releasing the reader.
    pub shutdown_drain: Duration,
    /// Cycle the publisher on/off once before accepting taps.
    pub reset_on_startup: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            id_source: IdSource::default(),
            max_duration: Duration::from_secs(60),
            tick_interval: Duration::from_secs(1),
            settle_delay: Duration::from_secs(2),
            shutdown_drain: Duration::from_secs(2),
            reset_on_startup: true,
        }
    }
}

impl BridgeConfig {
    /// Reject timing values the session loop cannot work with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.tick_interval.is_zero() {
            return Err(CoreError::InvalidConfig {
                field: "tick_interval".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if let IdSource::Search { file_name, .. } = &self.id_source {
            if file_name.is_empty() {
                return Err(CoreError::InvalidConfig {
                    field: "id_file".into(),
                    reason: "file name must not be empty".into(),
                });
            }
        }
        Ok(())
    }

    /// Session timing derived from this configuration.
    pub fn session_timing(&self) -> SessionTiming {
        SessionTiming {
            max_duration: self.max_duration,
            tick_interval: self.tick_interval,
        }
    }
}

/// Per-session timing, copied into every [`PublishSession`](crate::PublishSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTiming {
    pub max_duration: Duration,
    pub tick_interval: Duration,
}

impl SessionTiming {
    /// `ceil(max_duration / tick_interval)`; zero when `max_duration` is zero.
    pub fn max_ticks(&self) -> u64 {
        let max = self.max_duration.as_nanos();
        let tick = self.tick_interval.as_nanos().max(1);
        let ticks = max.div_ceil(tick);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}

impl Default for SessionTiming {
    fn default() -> Self {
        BridgeConfig::default().session_timing()
    }
}
