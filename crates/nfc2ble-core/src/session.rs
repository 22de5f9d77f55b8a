// ── Publish session ──
//
// One bounded BLE advertisement run for a single tag id:
//
//   Idle ──▶ Publishing ──▶ Stopping ──▶ Idle
//
// The session owns the publisher (through the shared slot) for its whole
// run and hands it back only after `stop` returned. Cancellation is
// cooperative: the tick wait races the token, so a stop is observed as
// soon as it is requested, never later than one tick.

use std::sync::Arc;

use strum::Display;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::config::SessionTiming;
use crate::port::BlePublisher;

/// The single owner of the publisher, shared by every session.
pub type PublisherSlot<P> = Arc<Mutex<P>>;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum SessionState {
    Idle,
    Publishing,
    Stopping,
}

/// How a session's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionEnd {
    /// Ran for its full duration.
    Expired,
    /// Stopped early by its handle (preemption or shutdown).
    Cancelled,
    /// Cancelled before it got hold of the publisher; never advertised.
    Skipped,
    /// The publisher refused to start.
    StartFailed,
}

// ── SessionHandle ────────────────────────────────────────────────

/// Cancellation and observation handle for a [`PublishSession`].
///
/// Cheap to clone. Stopping through a handle never blocks.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: u64,
    tag_id: Arc<str>,
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn tag_id(&self) -> &str {
        &self.tag_id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Ask the session to stop at its next tick boundary.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `true` once the session task is gone and the publisher is released.
    pub fn is_finished(&self) -> bool {
        self.state.has_changed().is_err()
    }

    /// Wait until the session has returned to `Idle` and released the
    /// publisher. Resolves immediately for a finished session.
    pub async fn wait_idle(&self) {
        let mut state = self.state.clone();
        // The sender is dropped when the run loop returns.
        while state.changed().await.is_ok() {}
    }
}

// ── PublishSession ───────────────────────────────────────────────

/// A single advertisement run. Created by the
/// [`SessionController`](crate::SessionController), consumed by [`run`](Self::run).
pub struct PublishSession<P> {
    id: u64,
    tag_id: Arc<str>,
    timing: SessionTiming,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
    slot: PublisherSlot<P>,
}

impl<P: BlePublisher> PublishSession<P> {
    pub fn new(
        id: u64,
        tag_id: impl Into<Arc<str>>,
        timing: SessionTiming,
        slot: PublisherSlot<P>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            id,
            tag_id: tag_id.into(),
            timing,
            cancel: CancellationToken::new(),
            state,
            slot,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            id: self.id,
            tag_id: Arc::clone(&self.tag_id),
            cancel: self.cancel.clone(),
            state: self.state.subscribe(),
        }
    }

    /// Drive the session to completion.
    pub async fn run(self) -> SessionEnd {
        let span = info_span!("session", id = self.id, tag_id = %self.tag_id);
        self.run_inner().instrument(span).await
    }

    async fn run_inner(self) -> SessionEnd {
        // Waits here while an older session is still stopping.
        let mut publisher = self.slot.lock().await;
        if self.cancel.is_cancelled() {
            debug!("cancelled before publishing");
            return SessionEnd::Skipped;
        }

        self.state.send_replace(SessionState::Publishing);
        if let Err(e) = publisher.start(&self.tag_id).await {
            warn!(error = %e, "publish start failed");
            drop(publisher);
            self.state.send_replace(SessionState::Idle);
            return SessionEnd::StartFailed;
        }
        info!(max_duration = ?self.timing.max_duration, "publishing");

        let max_ticks = self.timing.max_ticks();
        let mut ticks = 0_u64;
        let end = loop {
            if ticks >= max_ticks {
                break SessionEnd::Expired;
            }
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break SessionEnd::Cancelled,
                () = tokio::time::sleep(self.timing.tick_interval) => ticks += 1,
            }
        };

        self.state.send_replace(SessionState::Stopping);
        if let Err(e) = publisher.stop().await {
            warn!(error = %e, "publish stop failed");
        }
        drop(publisher);
        self.state.send_replace(SessionState::Idle);

        info!(%end, ticks, "done");
        end
    }
}
