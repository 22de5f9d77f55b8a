// ── Test doubles ──
//
// A publisher that records every start/stop with the (paused) tokio clock,
// so timing and ordering properties can be asserted exactly.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::PublishError;
use crate::port::BlePublisher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Start(String),
    Stop,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<(Instant, Call)>>>);

#[allow(clippy::unwrap_used)]
impl CallLog {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push((Instant::now(), call));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().iter().map(|(_, c)| c.clone()).collect()
    }

    pub(crate) fn timed(&self) -> Vec<(Instant, Call)> {
        self.0.lock().unwrap().clone()
    }

    pub(crate) fn stops(&self) -> usize {
        self.calls().iter().filter(|c| **c == Call::Stop).count()
    }

    /// Panics if two advertisements were ever live at once.
    pub(crate) fn assert_never_overlapping(&self) {
        let mut live = false;
        for call in self.calls() {
            match call {
                Call::Start(tag) => {
                    assert!(!live, "start({tag}) while another advertisement was live");
                    live = true;
                }
                Call::Stop => {
                    assert!(live, "stop without a live advertisement");
                    live = false;
                }
            }
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct RecordingPublisher {
    pub(crate) log: CallLog,
    pub(crate) fail_start: bool,
    /// `start` never resolves, like a wedged radio driver.
    pub(crate) hang_start: bool,
    pub(crate) fail_stop: bool,
    pub(crate) stop_latency: Duration,
}

impl RecordingPublisher {
    pub(crate) fn new() -> (Self, CallLog) {
        let publisher = Self::default();
        let log = publisher.log.clone();
        (publisher, log)
    }
}

impl BlePublisher for RecordingPublisher {
    async fn start(&mut self, tag_id: &str) -> Result<(), PublishError> {
        if self.fail_start {
            return Err(PublishError::Start(format!("radio busy for {tag_id}")));
        }
        if self.hang_start {
            std::future::pending::<()>().await;
        }
        self.log.push(Call::Start(tag_id.to_owned()));
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), PublishError> {
        if !self.stop_latency.is_zero() {
            tokio::time::sleep(self.stop_latency).await;
        }
        self.log.push(Call::Stop);
        if self.fail_stop {
            return Err(PublishError::Stop("radio did not acknowledge".into()));
        }
        Ok(())
    }
}
