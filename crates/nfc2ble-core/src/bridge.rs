// ── Bridge ──
//
// Process-level control surface. Owns the reader loop, the dispatcher and
// the shutdown drain:
//
//   reset publisher ─▶ loop { reader.next_event ─▶ dispatcher } ─▶ drain ─▶ close reader

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::BridgeConfig;
use crate::controller::SessionController;
use crate::dispatcher::Dispatcher;
use crate::error::CoreError;
use crate::identity::IdentityMap;
use crate::port::{BlePublisher, NfcReader};

/// NFC → BLE bridge: feeds reader events through a [`Dispatcher`] until
/// the reader ends or shutdown is requested.
pub struct Bridge<P> {
    config: BridgeConfig,
    dispatcher: Dispatcher<P>,
    shutdown: CancellationToken,
}

impl<P: BlePublisher> Bridge<P> {
    pub fn new(
        config: BridgeConfig,
        ids: Arc<IdentityMap>,
        publisher: P,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        let controller = SessionController::from_config(publisher, &config);
        Ok(Self {
            config,
            dispatcher: Dispatcher::new(ids, controller),
            shutdown: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn controller(&self) -> &SessionController<P> {
        self.dispatcher.controller()
    }

    /// Token that ends [`run`](Self::run) when cancelled. Hand a clone to
    /// the signal handler.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Drive the bridge until the reader is exhausted or shutdown is
    /// requested, then drain the active session and close the reader.
    ///
    /// A reader failure ends the loop and is returned after the drain.
    pub async fn run<R: NfcReader>(&self, mut reader: R) -> Result<(), CoreError> {
        if self.config.reset_on_startup {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    warn!("shutdown requested during publisher reset");
                }
                done = self.controller().reset_publisher(self.config.settle_delay) => {
                    if !done {
                        warn!("continuing without a confirmed publisher reset");
                    }
                }
            }
        }
        info!("bridge ready");

        let result = loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    info!("shutdown requested");
                    break Ok(());
                }
                event = reader.next_event() => match event {
                    Ok(Some(event)) => {
                        if !self.dispatcher.handle(event).await {
                            break Ok(());
                        }
                    }
                    Ok(None) => {
                        info!("reader closed");
                        break Ok(());
                    }
                    Err(e) => {
                        error!(error = %e, "reader failed");
                        break Err(e);
                    }
                },
            }
        };

        self.controller().drain(self.config.shutdown_drain).await;
        reader.close().await;
        info!("bridge stopped");
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::port::ReaderEvent;
    use crate::testing::{Call, CallLog, RecordingPublisher};

    const MAPPING: &str = "nfc1,tagA\nnfc1,tagB\n# comment\nnfc2,tagC\n";

    fn bridge(reset: bool) -> (Bridge<RecordingPublisher>, CallLog) {
        let (publisher, log) = RecordingPublisher::new();
        (bridge_with(publisher, reset), log)
    }

    fn bridge_with(publisher: RecordingPublisher, reset: bool) -> Bridge<RecordingPublisher> {
        let ids = IdentityMap::new();
        assert_eq!(ids.load_str(MAPPING).loaded, 3);
        let config = BridgeConfig {
            reset_on_startup: reset,
            ..BridgeConfig::default()
        };
        Bridge::new(config, Arc::new(ids), publisher).unwrap()
    }

    /// Feed `events` to the bridge one every 100ms, then end the input.
    fn paced(events: Vec<ReaderEvent>) -> mpsc::Receiver<ReaderEvent> {
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            for event in events {
                tx.send(event).await.unwrap();
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });
        rx
    }

    fn connect(id: &str) -> ReaderEvent {
        ReaderEvent::Connect(id.into())
    }

    #[tokio::test(start_paused = true)]
    async fn taps_flow_through_to_publisher() {
        let (bridge, log) = bridge(true);
        let reader = paced(vec![
            connect("nfc1"),
            connect("nfc1"),
            connect("nfc1"),
            connect("nfc2"),
            connect("nfc9"),
            ReaderEvent::Release("nfc2".into()),
        ]);

        bridge.run(reader).await.unwrap();

        let started: Vec<_> = log
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Start(tag) => Some(tag),
                Call::Stop => None,
            })
            .collect();
        assert_eq!(started, ["dummy", "tagA", "tagB", "tagA", "tagC"]);
        assert_eq!(log.stops(), 5);
        log.assert_never_overlapping();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_session_and_closes_reader() {
        let (bridge, log) = bridge(false);
        let (tx, rx) = mpsc::channel(8);
        tx.send(connect("nfc2")).await.unwrap();

        let token = bridge.shutdown_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            token.cancel();
        });

        let started = tokio::time::Instant::now();
        bridge.run(rx).await.unwrap();

        assert!(tokio::time::Instant::now() - started < Duration::from_secs(7));
        assert_eq!(log.calls(), vec![Call::Start("tagC".into()), Call::Stop]);
        assert!(tx.is_closed());
        assert!(bridge.controller().current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn no_reset_when_disabled() {
        let (bridge, log) = bridge(false);
        let (tx, rx) = mpsc::channel::<ReaderEvent>(1);
        drop(tx);
        bridge.run(rx).await.unwrap();
        assert!(log.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_hung_reset_still_returns() {
        let (mut publisher, log) = RecordingPublisher::new();
        publisher.hang_start = true;
        let bridge = bridge_with(publisher, true);
        let (tx, rx) = mpsc::channel::<ReaderEvent>(1);

        let token = bridge.shutdown_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            token.cancel();
        });

        let finished = tokio::time::timeout(Duration::from_secs(3600), bridge.run(rx)).await;
        assert!(matches!(finished, Ok(Ok(()))));
        assert!(tx.is_closed());
        assert!(log.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hung_reset_times_out_and_reader_is_still_served() {
        let (mut publisher, _log) = RecordingPublisher::new();
        publisher.hang_start = true;
        let bridge = bridge_with(publisher, true);
        let (tx, rx) = mpsc::channel::<ReaderEvent>(1);
        drop(tx);

        let started = tokio::time::Instant::now();
        let finished = tokio::time::timeout(Duration::from_secs(3600), bridge.run(rx)).await;
        assert!(matches!(finished, Ok(Ok(()))));
        // settle delay for the reset, then the shutdown drain.
        assert_eq!(tokio::time::Instant::now() - started, Duration::from_secs(4));
    }

    struct BrokenReader {
        closed: Arc<AtomicBool>,
    }

    impl NfcReader for BrokenReader {
        async fn next_event(&mut self) -> Result<Option<ReaderEvent>, CoreError> {
            Err(CoreError::Reader {
                message: "device unplugged".into(),
            })
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reader_failure_is_returned_after_drain() {
        let (bridge, _log) = bridge(false);
        let closed = Arc::new(AtomicBool::new(false));
        let reader = BrokenReader {
            closed: Arc::clone(&closed),
        };
        let err = bridge.run(reader).await.unwrap_err();
        assert!(matches!(err, CoreError::Reader { .. }));
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn rejects_zero_tick_interval() {
        let config = BridgeConfig {
            tick_interval: Duration::ZERO,
            ..BridgeConfig::default()
        };
        let (publisher, _log) = RecordingPublisher::new();
        let result = Bridge::new(config, Arc::new(IdentityMap::new()), publisher);
        assert!(matches!(result, Err(CoreError::InvalidConfig { .. })));
    }
}
