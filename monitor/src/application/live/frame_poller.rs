use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::live_state::{LiveState, TickOutcome};
use crate::application::ports::MonitoringServicePort;
use crate::domain::value_objects::SessionId;

/// Nominal period between ticks (~8 requests per second)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(120);

const TICK_LOG_EVERY: u64 = 50;

/// Fixed-cadence fetch loop for one session.
///
/// Requests are issued one at a time: a tick never starts while the previous
/// request is outstanding, so a slow service stretches the cadence instead of
/// queueing requests.
pub struct FramePoller {
    service: Arc<dyn MonitoringServicePort>,
    live: Arc<LiveState>,
    period: Duration,
    failure_threshold: u32,
}

impl FramePoller {
    pub fn new(
        service: Arc<dyn MonitoringServicePort>,
        live: Arc<LiveState>,
        period: Duration,
        failure_threshold: u32,
    ) -> Self {
        Self {
            service,
            live,
            period,
            failure_threshold,
        }
    }

    /// Spawns the loop for the session owning `epoch`
    pub fn spawn(self, session_id: SessionId, epoch: u64) -> PollerHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            self.run(session_id, epoch, token).await;
        });

        PollerHandle {
            cancel,
            task: Some(task),
        }
    }

    async fn run(self, session_id: SessionId, epoch: u64, cancel: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        info!(
            "[session {}] Frame poller started ({:?} period)",
            session_id, self.period
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            // Dropping the request future on cancel guarantees its response is never delivered
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.service.poll_frame() => result,
            };
            ticks += 1;

            match result {
                Ok(sample) => match self.live.apply_tick(epoch, sample) {
                    TickOutcome::Discarded => {
                        debug!("[session {}] Session moved on, discarding tick", session_id);
                        break;
                    }
                    TickOutcome::Applied {
                        fall_event_count: Some(count),
                        detections,
                    } => {
                        warn!(
                            "[session {}] Fall detected ({} detections, fall events: {})",
                            session_id, detections, count
                        );
                    }
                    TickOutcome::Applied { .. } => {}
                },
                Err(e) => match self.live.record_failure(epoch) {
                    Some(failures) if failures == self.failure_threshold => {
                        error!(
                            "[session {}] {} consecutive frame polls failed, latest: {}",
                            session_id, failures, e
                        );
                    }
                    Some(failures) => {
                        warn!(
                            "[session {}] Frame poll failed ({} in a row): {}",
                            session_id, failures, e
                        );
                    }
                    None => break,
                },
            }

            if ticks % TICK_LOG_EVERY == 0 {
                debug!("[session {}] {} ticks polled", session_id, ticks);
            }
        }

        info!(
            "[session {}] Frame poller stopped after {} ticks",
            session_id, ticks
        );
    }
}

/// Owns a running poller. Cancelling (or dropping) the handle is the only way
/// to end the loop.
pub struct PollerHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollerHandle {
    /// Stops further ticks immediately; an in-flight request is abandoned
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels and waits for the loop to exit
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                if e.is_panic() {
                    error!("Frame poller task panicked: {}", e);
                }
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
