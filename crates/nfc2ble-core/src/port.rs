//! Port traits: the boundary between the bridge core and the hardware.
//!
//! ```text
//!   NfcReader ──▶ Dispatcher ──▶ SessionController ──▶ BlePublisher
//! ```
//!
//! Reader and publisher drivers live outside this crate. The core only
//! sees these traits, so every component can be exercised with in-memory
//! doubles.

use std::future::Future;

use tokio::sync::mpsc;

use crate::error::{CoreError, PublishError};

/// Something the NFC reader observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A tag entered the field; carries its NFC identifier.
    Connect(String),
    /// A tag left the field.
    Release(String),
}

/// Source of NFC presence events.
///
/// `next_event` resolves to `Ok(None)` once the reader has no more events
/// (device closed, input exhausted).
pub trait NfcReader: Send {
    fn next_event(
        &mut self,
    ) -> impl Future<Output = Result<Option<ReaderEvent>, CoreError>> + Send;

    /// Release reader resources. Called once, after the last session drained.
    fn close(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// BLE advertiser for a single tag id at a time.
///
/// Both calls may be slow. They are only ever invoked from a publish
/// session's own task, never from the reader loop, and never concurrently:
/// sessions take turns through a shared publisher slot.
pub trait BlePublisher: Send + 'static {
    /// Begin advertising `tag_id`.
    fn start(&mut self, tag_id: &str) -> impl Future<Output = Result<(), PublishError>> + Send;

    /// Cease advertising.
    fn stop(&mut self) -> impl Future<Output = Result<(), PublishError>> + Send;
}

/// A channel receiver is a reader: handy for embedding and tests.
impl NfcReader for mpsc::Receiver<ReaderEvent> {
    async fn next_event(&mut self) -> Result<Option<ReaderEvent>, CoreError> {
        Ok(self.recv().await)
    }

    async fn close(&mut self) {
        mpsc::Receiver::close(self);
    }
}
