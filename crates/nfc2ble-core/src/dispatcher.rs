// ── Reader event dispatch ──

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::controller::SessionController;
use crate::identity::IdentityMap;
use crate::port::{BlePublisher, ReaderEvent};

/// Routes NFC reader events to publish sessions.
///
/// Callbacks return `true` to keep the reader loop going. Steady-state
/// failures (unknown ids, publisher trouble) are logged, never returned.
pub struct Dispatcher<P> {
    ids: Arc<IdentityMap>,
    controller: SessionController<P>,
}

impl<P: BlePublisher> Dispatcher<P> {
    pub fn new(ids: Arc<IdentityMap>, controller: SessionController<P>) -> Self {
        Self { ids, controller }
    }

    pub fn controller(&self) -> &SessionController<P> {
        &self.controller
    }

    /// A tag entered the field: publish its next BLE id.
    pub async fn on_connect(&self, nfc_id: &str) -> bool {
        let Some(tag_id) = self.ids.lookup(nfc_id) else {
            warn!(nfc_id, "unknown NFC id");
            return true;
        };
        info!(nfc_id, tag_id = %tag_id, "tag connected");
        self.controller.admit(tag_id).await;
        true
    }

    /// A tag left the field. The running session keeps its full duration.
    #[allow(clippy::unused_self)]
    pub fn on_release(&self, id: &str) -> bool {
        debug!(id, "tag released");
        true
    }

    pub async fn handle(&self, event: ReaderEvent) -> bool {
        match event {
            ReaderEvent::Connect(nfc_id) => self.on_connect(&nfc_id).await,
            ReaderEvent::Release(id) => self.on_release(&id),
        }
    }
}
