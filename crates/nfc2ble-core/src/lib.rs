// nfc2ble-core: NFC identifier rotation and BLE publish-session control.

pub mod bridge;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod identity;
pub mod port;
pub mod session;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use bridge::Bridge;
pub use config::{BridgeConfig, DEFAULT_ID_FILE, IdSource, RESET_TAG_ID, SessionTiming};
pub use controller::SessionController;
pub use dispatcher::Dispatcher;
pub use error::{CoreError, PublishError};
pub use identity::{IdentityMap, LoadReport, search_id_file};
pub use port::{BlePublisher, NfcReader, ReaderEvent};
pub use session::{PublishSession, PublisherSlot, SessionEnd, SessionHandle, SessionState};
