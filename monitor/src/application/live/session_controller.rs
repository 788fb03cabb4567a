use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::frame_poller::{FramePoller, PollerHandle, DEFAULT_POLL_INTERVAL};
use super::live_state::LiveState;
use super::snapshot::LiveSnapshot;
use crate::application::ports::{MonitoringServicePort, StartOutcome, StopOutcome};
use crate::application::MonitorError;
use crate::domain::events::{DomainEvent, MonitorEvent};

/// Timing policy for one controller
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub start_timeout: Duration,
    pub stop_timeout: Duration,
    /// Consecutive poll failures before an error is logged
    pub failure_threshold: u32,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            start_timeout: Duration::from_secs(10),
            stop_timeout: Duration::from_secs(5),
            failure_threshold: 25,
        }
    }
}

/// Drives one live monitoring session against a remote inference service.
///
/// `start` and `stop` are serialised by the lifecycle lock; `snapshot` only
/// reads the last published [`LiveSnapshot`] and never waits on either.
/// Each controller owns its state, so one controller per camera is fine.
pub struct SessionController {
    service: Arc<dyn MonitoringServicePort>,
    live: Arc<LiveState>,
    poller: Mutex<Option<PollerHandle>>,
    settings: ControllerSettings,
}

impl SessionController {
    pub fn new(service: Arc<dyn MonitoringServicePort>, settings: ControllerSettings) -> Self {
        Self {
            service,
            live: Arc::new(LiveState::new()),
            poller: Mutex::new(None),
            settings,
        }
    }

    /// Starts a session. Idempotent: returns `Ok` without contacting the
    /// service when a session is already running.
    pub async fn start(&self) -> Result<(), MonitorError> {
        let mut poller = self.poller.lock().await;
        if poller.is_some() {
            debug!("Live monitoring already running, start is a no-op");
            return Ok(());
        }

        self.live.begin_start()?;
        info!("Starting live monitoring");

        let outcome = match timeout(self.settings.start_timeout, self.service.start()).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout {
                operation: "start",
                after: self.settings.start_timeout,
            }),
        };

        let already_running = match outcome {
            Ok(StartOutcome::Started) => false,
            Ok(StartOutcome::AlreadyRunning) => true,
            Ok(StartOutcome::Rejected(reason)) => {
                self.live.abort_start();
                warn!("Remote service refused to start: {}", reason);
                return Err(MonitorError::RemoteRejected(reason));
            }
            Err(e) => {
                self.live.abort_start();
                warn!("Failed to start live monitoring: {}", e);
                return Err(e);
            }
        };

        let (epoch, session_id) = match self.live.enter_running(already_running) {
            Ok(entered) => entered,
            Err(e) => {
                self.live.abort_start();
                return Err(e.into());
            }
        };

        *poller = Some(
            FramePoller::new(
                Arc::clone(&self.service),
                Arc::clone(&self.live),
                self.settings.poll_interval,
                self.settings.failure_threshold,
            )
            .spawn(session_id, epoch),
        );

        info!(
            "[session {}] Live monitoring running{}",
            session_id,
            if already_running { " (remote was already running)" } else { "" }
        );
        Ok(())
    }

    /// Stops the session. Locally terminal: the controller is `Idle` when this
    /// returns, even if the remote stop call failed (that failure is returned).
    /// A no-op when nothing is running.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        let mut poller = self.poller.lock().await;
        let handle = poller.take();

        // The epoch must be dead before cancellation is requested, so a poll
        // resolving in between is discarded by `apply_tick`
        let stopping = self.live.begin_stop();
        if let Some(handle) = &handle {
            handle.cancel();
        }

        if !stopping {
            debug!("Live monitoring not running, stop is a no-op");
            return Ok(());
        }

        let session_id = self.live.snapshot().session_id;
        info!("Stopping live monitoring");

        let result = match timeout(self.settings.stop_timeout, self.service.stop()).await {
            Ok(Ok(StopOutcome::Stopped)) => Ok(()),
            Ok(Ok(StopOutcome::NotRunning)) => {
                debug!("Remote service reported it was not running");
                Ok(())
            }
            Ok(Ok(StopOutcome::Rejected(reason))) => Err(MonitorError::RemoteRejected(reason)),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(MonitorError::Timeout {
                operation: "stop",
                after: self.settings.stop_timeout,
            }),
        };

        if let Some(handle) = handle {
            handle.shutdown().await;
        }

        if let Err(e) = &result {
            warn!("Remote stop failed, going idle anyway: {}", e);
        }
        self.live.finish_stop(result.is_ok());

        match session_id {
            Some(id) => info!("[session {}] Live monitoring stopped", id),
            None => info!("Live monitoring stopped"),
        }
        result
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.live.snapshot()
    }

    /// Notified on every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.live.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<DomainEvent<MonitorEvent>> {
        self.live.events()
    }

    pub async fn stream_url(&self) -> Result<String, MonitorError> {
        self.service.stream_url().await
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{FrameSample, MockMonitoringServicePort};
    use crate::domain::aggregates::SessionState;
    use crate::domain::value_objects::{Confidence, Detection, Frame};
    use chrono::Utc;

    fn controller(mock: MockMonitoringServicePort) -> SessionController {
        SessionController::new(Arc::new(mock), ControllerSettings::default())
    }

    fn person_sample() -> FrameSample {
        FrameSample {
            frame: Frame::new(vec![0xff, 0xd8], Utc::now()),
            detections: vec![Detection::new("person", Confidence::new(0.8).unwrap())],
        }
    }

    #[tokio::test]
    async fn test_stop_when_idle_does_not_call_remote() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_stop().never();

        let controller = controller(mock);

        assert!(controller.stop().await.is_ok());
        assert!(controller.stop().await.is_ok());
        assert_eq!(controller.snapshot().state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_rejected_start_surfaces_error_and_stays_idle() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_start()
            .times(1)
            .returning(|| Ok(StartOutcome::Rejected("Failed to connect to camera".to_string())));
        mock.expect_poll_frame().never();

        let controller = controller(mock);
        let err = controller.start().await.unwrap_err();

        assert!(matches!(
            err,
            MonitorError::RemoteRejected(ref reason) if reason == "Failed to connect to camera"
        ));
        assert_eq!(controller.snapshot().state, SessionState::Idle);
    }

    #[tokio::test]
    async fn test_transport_error_on_start_stays_idle() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_start()
            .times(1)
            .returning(|| Err(MonitorError::Transport("connection refused".to_string())));

        let controller = controller(mock);

        assert!(controller.start().await.unwrap_err().is_transport());
        assert_eq!(controller.snapshot().state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_running_counts_as_success() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_start()
            .times(1)
            .returning(|| Ok(StartOutcome::AlreadyRunning));
        mock.expect_poll_frame().returning(|| Ok(person_sample()));
        mock.expect_stop().times(1).returning(|| Ok(StopOutcome::Stopped));

        let controller = controller(mock);
        let mut events = controller.events();

        controller.start().await.unwrap();
        assert_eq!(controller.snapshot().state, SessionState::Running);

        let started = events.recv().await.unwrap();
        assert!(matches!(
            started.data,
            MonitorEvent::SessionStarted { already_running: true, .. }
        ));

        controller.stop().await.unwrap();
        assert_eq!(controller.snapshot().state, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_while_running_is_noop() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_start().times(1).returning(|| Ok(StartOutcome::Started));
        mock.expect_poll_frame().returning(|| Ok(person_sample()));
        mock.expect_stop().times(1).returning(|| Ok(StopOutcome::Stopped));

        let controller = controller(mock);
        controller.start().await.unwrap();
        let first_session = controller.snapshot().session_id;

        controller.start().await.unwrap();

        assert_eq!(controller.snapshot().session_id, first_session);
        controller.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_remote_stop_still_goes_idle() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_start().times(1).returning(|| Ok(StartOutcome::Started));
        mock.expect_poll_frame().returning(|| Ok(person_sample()));
        mock.expect_stop()
            .times(1)
            .returning(|| Err(MonitorError::Transport("connection reset".to_string())));

        let controller = controller(mock);
        controller.start().await.unwrap();
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(controller.snapshot().current_frame.is_some());

        assert!(controller.stop().await.is_err());

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.current_frame.is_none());
        assert!(snapshot.current_detections.is_empty());

        // Already idle: no second remote call
        assert!(controller.stop().await.is_ok());
    }

    #[tokio::test]
    async fn test_stream_url_passes_through() {
        let mut mock = MockMonitoringServicePort::new();
        mock.expect_stream_url()
            .times(1)
            .returning(|| Ok("rtsp://camera:554/stream1".to_string()));

        let controller = controller(mock);

        assert_eq!(controller.stream_url().await.unwrap(), "rtsp://camera:554/stream1");
    }
}
