// ── BLE publisher drivers ──

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use nfc2ble_config::{PublisherConfig, PublisherKind};
use nfc2ble_core::{BlePublisher, PublishError};

use crate::error::CliError;

/// Placeholder replaced by the tag id in command templates.
const TAG_PLACEHOLDER: &str = "{tag}";

/// Environment variable carrying the tag id to publisher commands.
const TAG_ENV: &str = "NFC2BLE_TAG";

// ── LogPublisher ─────────────────────────────────────────────────────

/// Dry-run publisher: records what would be advertised in the log.
#[derive(Debug, Default)]
pub struct LogPublisher {
    live: Option<String>,
}

impl BlePublisher for LogPublisher {
    async fn start(&mut self, tag_id: &str) -> Result<(), PublishError> {
        info!(tag_id, "advertising started");
        self.live = Some(tag_id.to_owned());
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PublishError> {
        match self.live.take() {
            Some(tag_id) => info!(tag_id = %tag_id, "advertising stopped"),
            None => debug!("stop with nothing advertised"),
        }
        Ok(())
    }
}

// ── CommandPublisher ─────────────────────────────────────────────────

/// Drives an external advertiser through `sh -c` commands.
///
/// `{tag}` in either template is replaced by the tag id; the id is also
/// exported as `NFC2BLE_TAG`. A non-zero exit is a publish failure.
#[derive(Debug)]
pub struct CommandPublisher {
    start: String,
    stop: String,
    live: Option<String>,
}

impl CommandPublisher {
    pub fn new(start: impl Into<String>, stop: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            stop: stop.into(),
            live: None,
        }
    }
}

/// Run `template` with the tag substituted; a non-zero exit becomes `failed(..)`.
async fn run_shell(
    template: &str,
    tag_id: &str,
    failed: fn(String) -> PublishError,
) -> Result<(), PublishError> {
    let command = template.replace(TAG_PLACEHOLDER, tag_id);
    debug!(command = %command, "running publisher command");
    let status = Command::new("sh")
        .arg("-c")
        .arg(&command)
        .env(TAG_ENV, tag_id)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await?;
    if status.success() {
        Ok(())
    } else {
        Err(failed(format!("`{command}` exited with {status}")))
    }
}

impl BlePublisher for CommandPublisher {
    async fn start(&mut self, tag_id: &str) -> Result<(), PublishError> {
        run_shell(&self.start, tag_id, PublishError::Start).await?;
        self.live = Some(tag_id.to_owned());
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PublishError> {
        let tag_id = self.live.take().unwrap_or_default();
        run_shell(&self.stop, &tag_id, PublishError::Stop).await
    }
}

// ── AnyPublisher ─────────────────────────────────────────────────────

/// Publisher chosen at runtime from configuration.
#[derive(Debug)]
pub enum AnyPublisher {
    Log(LogPublisher),
    Command(CommandPublisher),
}

impl AnyPublisher {
    pub fn from_config(config: &PublisherConfig) -> Result<Self, CliError> {
        match config.kind {
            PublisherKind::Log => Ok(Self::Log(LogPublisher::default())),
            PublisherKind::Command => {
                let start = required("publisher.start_command", config.start_command.as_ref())?;
                let stop = required("publisher.stop_command", config.stop_command.as_ref())?;
                Ok(Self::Command(CommandPublisher::new(start, stop)))
            }
        }
    }
}

fn required(field: &str, value: Option<&String>) -> Result<String, CliError> {
    value.cloned().ok_or_else(|| CliError::Validation {
        field: field.into(),
        reason: "required for the command publisher".into(),
    })
}

impl BlePublisher for AnyPublisher {
    async fn start(&mut self, tag_id: &str) -> Result<(), PublishError> {
        match self {
            Self::Log(p) => p.start(tag_id).await,
            Self::Command(p) => p.start(tag_id).await,
        }
    }

    async fn stop(&mut self) -> Result<(), PublishError> {
        match self {
            Self::Log(p) => p.stop().await,
            Self::Command(p) => p.stop().await,
        }
    }
}
