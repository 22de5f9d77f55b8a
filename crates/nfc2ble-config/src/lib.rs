//! Configuration for the nfc2ble bridge.
//!
//! Layered with figment: built-in defaults, then the TOML file, then
//! `NFC2BLE_*` environment variables (nested keys separated by `__`).
//! The binary applies its command-line flags on top and translates the
//! result into a [`nfc2ble_core::BridgeConfig`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nfc2ble_core::config::default_search_dirs;
use nfc2ble_core::{BridgeConfig, DEFAULT_ID_FILE, IdSource};

/// Prefix for environment overrides, e.g. `NFC2BLE_SESSION__MAX_DURATION_SECS=30`.
pub const ENV_PREFIX: &str = "NFC2BLE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub ids: IdsConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub publisher: PublisherConfig,
}

/// Where the NFC → BLE identifier file lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IdsConfig {
    /// Explicit file; disables the directory search.
    pub file: Option<PathBuf>,

    /// File name looked up in `search_dirs`.
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// Directories searched in order. Empty means `.`, `$HOME`, `/etc`.
    #[serde(default)]
    pub search_dirs: Vec<PathBuf>,
}

impl Default for IdsConfig {
    fn default() -> Self {
        Self {
            file: None,
            file_name: default_file_name(),
            search_dirs: Vec::new(),
        }
    }
}

fn default_file_name() -> String {
    DEFAULT_ID_FILE.into()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,

    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_shutdown_drain_ms")]
    pub shutdown_drain_ms: u64,

    #[serde(default = "default_true")]
    pub reset_on_startup: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: default_max_duration_secs(),
            tick_interval_ms: default_tick_interval_ms(),
            settle_delay_ms: default_settle_delay_ms(),
            shutdown_drain_ms: default_shutdown_drain_ms(),
            reset_on_startup: true,
        }
    }
}

fn default_max_duration_secs() -> u64 {
    60
}
fn default_tick_interval_ms() -> u64 {
    1000
}
fn default_settle_delay_ms() -> u64 {
    2000
}
fn default_shutdown_drain_ms() -> u64 {
    2000
}
fn default_true() -> bool {
    true
}

/// Which BLE publisher backend to drive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherKind {
    /// Dry run: log start/stop only.
    #[default]
    Log,
    /// Run shell commands for start/stop.
    Command,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PublisherConfig {
    #[serde(default)]
    pub kind: PublisherKind,

    /// Shell command that starts advertising; `{tag}` is replaced by the tag id.
    pub start_command: Option<String>,

    /// Shell command that stops advertising.
    pub stop_command: Option<String>,
}

impl Config {
    /// Check settings the bridge cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.tick_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "session.tick_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.ids.file.is_none() && self.ids.file_name.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "ids.file_name".into(),
                reason: "must not be empty".into(),
            });
        }
        if self.publisher.kind == PublisherKind::Command {
            for (field, value) in [
                ("publisher.start_command", &self.publisher.start_command),
                ("publisher.stop_command", &self.publisher.stop_command),
            ] {
                if value.as_deref().is_none_or(|cmd| cmd.trim().is_empty()) {
                    return Err(ConfigError::Validation {
                        field: field.into(),
                        reason: "required when publisher.kind = \"command\"".into(),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn id_source(&self) -> IdSource {
        if let Some(ref file) = self.ids.file {
            return IdSource::Explicit(file.clone());
        }
        let dirs = if self.ids.search_dirs.is_empty() {
            default_search_dirs()
        } else {
            self.ids.search_dirs.clone()
        };
        IdSource::Search {
            file_name: self.ids.file_name.clone(),
            dirs,
        }
    }

    /// Translate into the core runtime configuration.
    pub fn to_bridge_config(&self) -> Result<BridgeConfig, ConfigError> {
        self.validate()?;
        let s = &self.session;
        Ok(BridgeConfig {
            id_source: self.id_source(),
            max_duration: Duration::from_secs(s.max_duration_secs),
            tick_interval: Duration::from_millis(s.tick_interval_ms),
            settle_delay: Duration::from_millis(s.settle_delay_ms),
            shutdown_drain: Duration::from_millis(s.shutdown_drain_ms),
            reset_on_startup: s.reset_on_startup,
        })
    }

    /// Render as TOML, the format [`load_config`] reads.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "nfc2ble", "nfc2ble").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("nfc2ble");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from file + environment.
///
/// With `path` set the file must exist; otherwise the platform config
/// path is used when present and silently skipped when not.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => {
            if !path.is_file() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            load_config_from(path)
        }
        None => load_config_from(&config_path()),
    }
}

/// Layer defaults, `path` (if it exists) and the environment.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}
