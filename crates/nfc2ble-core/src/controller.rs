// ── Session controller ──
//
// Admits publish sessions one at a time. A new admission preempts the
// current session: it is cancelled, and `admit` waits (bounded by the
// settle delay) for its stop acknowledgment before spawning the next one.
// The publisher slot guarantees the next `start` cannot overtake the
// previous `stop` even when that wait times out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{BridgeConfig, RESET_TAG_ID, SessionTiming};
use crate::port::BlePublisher;
use crate::session::{PublishSession, PublisherSlot, SessionEnd, SessionHandle};

/// Ensures at most one [`PublishSession`] is active at a time.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
pub struct SessionController<P> {
    inner: Arc<ControllerInner<P>>,
}

impl<P> Clone for SessionController<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<P> {
    slot: PublisherSlot<P>,
    timing: SessionTiming,
    settle_delay: Duration,
    /// Most recently admitted session. Held across the whole of `admit`,
    /// which serializes admissions.
    current: Mutex<Option<ActiveSession>>,
    next_id: AtomicU64,
}

struct ActiveSession {
    handle: SessionHandle,
    task: JoinHandle<SessionEnd>,
}

impl<P: BlePublisher> SessionController<P> {
    pub fn new(publisher: P, timing: SessionTiming, settle_delay: Duration) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                slot: Arc::new(Mutex::new(publisher)),
                timing,
                settle_delay,
                current: Mutex::new(None),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(publisher: P, config: &BridgeConfig) -> Self {
        Self::new(publisher, config.session_timing(), config.settle_delay)
    }

    /// Preempt the current session (if any) and start publishing `tag_id`.
    ///
    /// Returns once the new session is spawned; its run does not block the
    /// caller. Preemption does: up to the settle delay while the previous
    /// session acknowledges its stop.
    pub async fn admit(&self, tag_id: impl Into<String>) -> SessionHandle {
        self.admit_with(tag_id.into(), self.inner.timing).await
    }

    async fn admit_with(&self, tag_id: String, timing: SessionTiming) -> SessionHandle {
        let mut current = self.inner.current.lock().await;
        if let Some(previous) = current.take() {
            self.preempt(previous).await;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let session = PublishSession::new(id, tag_id, timing, Arc::clone(&self.inner.slot));
        let handle = session.handle();
        debug!(session = id, tag_id = handle.tag_id(), "admitting session");

        let task = tokio::spawn(session.run());
        *current = Some(ActiveSession {
            handle: handle.clone(),
            task,
        });
        handle
    }

    async fn preempt(&self, previous: ActiveSession) {
        let handle = previous.handle;
        if handle.is_finished() {
            return;
        }

        info!(
            session = handle.id(),
            tag_id = handle.tag_id(),
            "preempting active session"
        );
        handle.stop();
        if tokio::time::timeout(self.inner.settle_delay, handle.wait_idle())
            .await
            .is_err()
        {
            warn!(
                session = handle.id(),
                settle_delay = ?self.inner.settle_delay,
                "previous session did not acknowledge stop in time; next start waits for the publisher"
            );
        }
    }

    /// Handle of the most recently admitted session, finished or not.
    pub async fn current(&self) -> Option<SessionHandle> {
        self.inner
            .current
            .lock()
            .await
            .as_ref()
            .map(|active| active.handle.clone())
    }

    /// Signal the current session to stop, without waiting.
    pub async fn stop_current(&self) {
        if let Some(active) = self.inner.current.lock().await.as_ref() {
            active.handle.stop();
        }
    }

    /// Stop the current session and wait up to `timeout` for it to finish.
    ///
    /// Returns `false` if the session was still running when the wait
    /// gave up.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let Some(active) = self.inner.current.lock().await.take() else {
            return true;
        };
        active.handle.stop();

        match tokio::time::timeout(timeout, active.task).await {
            Ok(Ok(end)) => {
                debug!(session = active.handle.id(), %end, "session drained");
                true
            }
            Ok(Err(e)) => {
                warn!(session = active.handle.id(), error = %e, "session task failed");
                true
            }
            Err(_) => {
                warn!(
                    session = active.handle.id(),
                    ?timeout,
                    "session still running after drain"
                );
                false
            }
        }
    }

    /// Force the publisher through one start/stop cycle, waiting at most
    /// `timeout` for it to complete.
    ///
    /// Advertising may still be live from before this process started;
    /// a zero-length session leaves the radio in a known-off state.
    /// Returns `false` if the cycle was still running when the wait gave up.
    pub async fn reset_publisher(&self, timeout: Duration) -> bool {
        let timing = SessionTiming {
            max_duration: Duration::ZERO,
            tick_interval: self.inner.timing.tick_interval,
        };
        let handle = self.admit_with(RESET_TAG_ID.to_owned(), timing).await;
        if tokio::time::timeout(timeout, handle.wait_idle()).await.is_err() {
            warn!(
                session = handle.id(),
                ?timeout,
                "publisher reset did not complete in time"
            );
            return false;
        }
        debug!("publisher reset");
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::SessionState;
    use crate::testing::{Call, RecordingPublisher};

    fn controller(publisher: RecordingPublisher) -> SessionController<RecordingPublisher> {
        SessionController::new(
            publisher,
            SessionTiming {
                max_duration: Duration::from_secs(60),
                tick_interval: Duration::from_secs(1),
            },
            Duration::from_secs(2),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn admit_returns_without_waiting_for_the_run() {
        let (publisher, log) = RecordingPublisher::new();
        let ctl = controller(publisher);

        let before = tokio::time::Instant::now();
        let handle = ctl.admit("tagA").await;
        assert_eq!(tokio::time::Instant::now(), before);

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.state(), SessionState::Publishing);
        assert_eq!(log.calls(), vec![Call::Start("tagA".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn preemption_stops_old_before_starting_new() {
        let (publisher, log) = RecordingPublisher::new();
        let ctl = controller(publisher);

        let x = ctl.admit("x").await;
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let y = ctl.admit("y").await;
        y.wait_idle().await;

        assert!(x.is_finished());
        assert_eq!(
            log.calls(),
            vec![
                Call::Start("x".into()),
                Call::Stop,
                Call::Start("y".into()),
                Call::Stop,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_admissions_never_overlap() {
        let (mut publisher, log) = RecordingPublisher::new();
        publisher.stop_latency = Duration::from_millis(300);
        let ctl = controller(publisher);

        let gaps = [0_u64, 10, 250, 999, 1001, 5, 3000, 0, 40];
        let mut last = None;
        for (n, gap) in gaps.iter().enumerate() {
            tokio::time::sleep(Duration::from_millis(*gap)).await;
            last = Some(ctl.admit(format!("tag{n}")).await);
        }
        if let Some(last) = last {
            last.stop();
            last.wait_idle().await;
        }

        log.assert_never_overlapping();
        let current = ctl.current().await.map(|h| h.tag_id().to_owned());
        assert_eq!(current.as_deref(), Some("tag8"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_stop_beyond_settle_delay_still_serializes() {
        let (mut publisher, log) = RecordingPublisher::new();
        publisher.stop_latency = Duration::from_secs(5);
        let ctl = controller(publisher);

        ctl.admit("x").await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let before = tokio::time::Instant::now();
        let y = ctl.admit("y").await;
        // admit gave up after the settle delay...
        assert_eq!(tokio::time::Instant::now() - before, Duration::from_secs(2));
        assert_eq!(y.state(), SessionState::Idle);

        // ...but y only starts once x has fully stopped.
        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(y.state(), SessionState::Publishing);
        log.assert_never_overlapping();
        assert_eq!(
            log.calls(),
            vec![Call::Start("x".into()), Call::Stop, Call::Start("y".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn start_failure_is_not_retried_but_next_admit_tries_again() {
        let (mut publisher, log) = RecordingPublisher::new();
        publisher.fail_start = true;
        let ctl = controller(publisher);

        let first = ctl.admit("tagA").await;
        first.wait_idle().await;
        assert_eq!(first.state(), SessionState::Idle);
        assert!(log.calls().is_empty());

        ctl.inner.slot.lock().await.fail_start = false;
        let second = ctl.admit("tagA").await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(second.state(), SessionState::Publishing);
        assert_eq!(log.calls(), vec![Call::Start("tagA".into())]);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_stops_current_session() {
        let (publisher, log) = RecordingPublisher::new();
        let ctl = controller(publisher);

        let handle = ctl.admit("tagA").await;
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(ctl.drain(Duration::from_secs(2)).await);
        assert!(handle.is_finished());
        assert_eq!(log.stops(), 1);
        assert!(ctl.current().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_current_does_not_wait() {
        let (mut publisher, log) = RecordingPublisher::new();
        publisher.stop_latency = Duration::from_secs(1);
        let ctl = controller(publisher);

        let handle = ctl.admit("tagA").await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let before = tokio::time::Instant::now();
        ctl.stop_current().await;
        assert_eq!(tokio::time::Instant::now(), before);
        assert!(handle.is_stop_requested());

        handle.wait_idle().await;
        assert_eq!(log.calls(), vec![Call::Start("tagA".into()), Call::Stop]);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_with_nothing_running_is_immediate() {
        let (publisher, _log) = RecordingPublisher::new();
        let ctl = controller(publisher);
        assert!(ctl.drain(Duration::from_secs(2)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_cycles_publisher_once() {
        let (publisher, log) = RecordingPublisher::new();
        let ctl = controller(publisher);
        assert!(ctl.reset_publisher(Duration::from_secs(2)).await);
        assert_eq!(log.calls(), vec![Call::Start(RESET_TAG_ID.into()), Call::Stop]);
    }

    #[tokio::test(start_paused = true)]
    async fn hung_reset_gives_up_after_timeout() {
        let (mut publisher, log) = RecordingPublisher::new();
        publisher.hang_start = true;
        let ctl = controller(publisher);

        let before = tokio::time::Instant::now();
        assert!(!ctl.reset_publisher(Duration::from_secs(2)).await);
        assert_eq!(tokio::time::Instant::now() - before, Duration::from_secs(2));
        assert!(log.calls().is_empty());
        assert!(!ctl.current().await.unwrap().is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn session_ids_increase() {
        let (publisher, _log) = RecordingPublisher::new();
        let ctl = controller(publisher);
        let a = ctl.admit("a").await;
        let b = ctl.admit("b").await;
        assert!(b.id() > a.id());
    }
}
