use std::sync::{Mutex, MutexGuard};
use tokio::sync::{broadcast, watch};

use super::snapshot::LiveSnapshot;
use crate::application::ports::FrameSample;
use crate::domain::aggregates::{DetectionAggregator, InvalidTransition, MonitoringSession};
use crate::domain::events::{DomainEvent, MonitorEvent};
use crate::domain::value_objects::{Confidence, Detection, Frame, SessionId};

const EVENT_CAPACITY: usize = 64;

/// What happened to a tick handed to [`LiveState::apply_tick`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick belonged to a session that is no longer running
    Discarded,
    Applied {
        detections: usize,
        /// Set when the tick was a fall event
        fall_event_count: Option<u64>,
    },
}

/// Single-slot state shared by the controller and its poller.
///
/// Every mutation happens under one short, non-async lock and republishes
/// the snapshot, so readers never observe a half-applied tick.
pub struct LiveState {
    inner: Mutex<LiveInner>,
    snapshots: watch::Sender<LiveSnapshot>,
    events: broadcast::Sender<DomainEvent<MonitorEvent>>,
}

struct LiveInner {
    session: MonitoringSession,
    aggregator: DetectionAggregator,
    current_frame: Option<Frame>,
    current_detections: Vec<Detection>,
    consecutive_failures: u32,
}

impl LiveInner {
    fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            session_id: self.session.id,
            state: self.session.state,
            started_at: self.session.started_at,
            current_frame: self.current_frame.clone(),
            current_detections: self.current_detections.clone(),
            stats: self.aggregator.stats(),
            consecutive_poll_failures: self.consecutive_failures,
        }
    }
}

impl LiveState {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(LiveSnapshot::idle());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Mutex::new(LiveInner {
                session: MonitoringSession::new(),
                aggregator: DetectionAggregator::new(),
                current_frame: None,
                current_detections: Vec::new(),
                consecutive_failures: 0,
            }),
            snapshots,
            events,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LiveInner> {
        // A panic elsewhere must not wedge the controller
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, inner: &LiveInner) {
        self.snapshots.send_replace(inner.snapshot());
    }

    fn emit(&self, event: MonitorEvent) {
        // No subscribers is fine
        let _ = self.events.send(DomainEvent::new(event));
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveSnapshot> {
        self.snapshots.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<DomainEvent<MonitorEvent>> {
        self.events.subscribe()
    }

    pub fn begin_start(&self) -> Result<(), InvalidTransition> {
        let mut inner = self.lock();
        inner.session.begin_start()?;
        self.publish(&inner);
        Ok(())
    }

    pub fn abort_start(&self) {
        let mut inner = self.lock();
        inner.session.abort_start();
        self.publish(&inner);
    }

    /// Starting -> Running with fresh statistics. Returns the epoch the
    /// poller must present with every tick.
    pub fn enter_running(
        &self,
        already_running: bool,
    ) -> Result<(u64, SessionId), InvalidTransition> {
        let mut inner = self.lock();
        let epoch = inner.session.mark_running()?;
        let session_id = inner.session.id.unwrap_or_else(SessionId::generate);
        inner.aggregator.reset();
        inner.current_frame = None;
        inner.current_detections.clear();
        inner.consecutive_failures = 0;
        self.publish(&inner);
        drop(inner);

        self.emit(MonitorEvent::SessionStarted {
            session_id,
            already_running,
        });
        Ok((epoch, session_id))
    }

    /// Invalidates the running session's epoch. Returns false when there was
    /// no session to stop.
    pub fn begin_stop(&self) -> bool {
        let mut inner = self.lock();
        let stopping = inner.session.begin_stop();
        if stopping {
            self.publish(&inner);
        }
        stopping
    }

    pub fn finish_stop(&self, remote_acknowledged: bool) {
        let mut inner = self.lock();
        let session_id = inner.session.id;
        inner.current_frame = None;
        inner.current_detections.clear();
        inner.aggregator.clear_current();
        inner.consecutive_failures = 0;
        inner.session.mark_idle();
        self.publish(&inner);
        drop(inner);

        if let Some(session_id) = session_id {
            self.emit(MonitorEvent::SessionStopped {
                session_id,
                remote_acknowledged,
            });
        }
    }

    /// Overwrites the current frame and detections if `epoch` is still live
    pub fn apply_tick(&self, epoch: u64, sample: FrameSample) -> TickOutcome {
        let mut inner = self.lock();
        if !inner.session.accepts(epoch) {
            return TickOutcome::Discarded;
        }

        let fall = inner.aggregator.observe(&sample.detections);
        let peak_fall_confidence = sample
            .detections
            .iter()
            .filter(|d| d.is_fall())
            .map(|d| d.confidence)
            .fold(None, |peak: Option<Confidence>, c| match peak {
                Some(p) if p >= c => Some(p),
                _ => Some(c),
            });
        let detections = sample.detections.len();

        inner.current_frame = Some(sample.frame);
        inner.current_detections = sample.detections;
        inner.consecutive_failures = 0;
        let stats = inner.aggregator.stats();
        let session_id = inner.session.id;
        self.publish(&inner);
        drop(inner);

        let fall_event_count = fall.then_some(stats.fall_event_count);
        if let (Some(session_id), Some(count), Some(confidence)) =
            (session_id, fall_event_count, peak_fall_confidence)
        {
            self.emit(MonitorEvent::FallDetected {
                session_id,
                fall_event_count: count,
                confidence,
            });
        }

        TickOutcome::Applied {
            detections,
            fall_event_count,
        }
    }

    /// Counts a failed tick. Returns the consecutive failure count, or `None`
    /// when the tick belonged to a session that is no longer running.
    pub fn record_failure(&self, epoch: u64) -> Option<u32> {
        let mut inner = self.lock();
        if !inner.session.accepts(epoch) {
            return None;
        }
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        let count = inner.consecutive_failures;
        self.publish(&inner);
        Some(count)
    }
}

impl Default for LiveState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::SessionState;
    use chrono::Utc;

    fn sample(classes: &[(&str, f64)]) -> FrameSample {
        FrameSample {
            frame: Frame::new(vec![0xff, 0xd8], Utc::now()),
            detections: classes
                .iter()
                .map(|(class, conf)| Detection::new(*class, Confidence::new(*conf).unwrap()))
                .collect(),
        }
    }

    fn running_state() -> (LiveState, u64) {
        let state = LiveState::new();
        state.begin_start().unwrap();
        let (epoch, _) = state.enter_running(false).unwrap();
        (state, epoch)
    }

    #[test]
    fn applied_tick_updates_snapshot() {
        let (state, epoch) = running_state();

        let outcome = state.apply_tick(epoch, sample(&[("person", 0.8)]));

        assert_eq!(
            outcome,
            TickOutcome::Applied {
                detections: 1,
                fall_event_count: None
            }
        );
        let snapshot = state.snapshot();
        assert!(snapshot.current_frame.is_some());
        assert_eq!(snapshot.current_detections.len(), 1);
        assert_eq!(snapshot.stats.current_detection_count, 1);
    }

    #[test]
    fn tick_from_previous_epoch_is_discarded() {
        let (state, epoch) = running_state();
        assert!(state.begin_stop());

        let outcome = state.apply_tick(epoch, sample(&[("fall", 0.9)]));
        assert_eq!(outcome, TickOutcome::Discarded);

        state.finish_stop(true);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.state, SessionState::Idle);
        assert!(snapshot.current_frame.is_none());
        assert!(snapshot.current_detections.is_empty());
        assert_eq!(snapshot.stats.fall_event_count, 0);
    }

    #[test]
    fn fall_resolving_once_stop_began_is_not_counted() {
        let (state, epoch) = running_state();
        state.apply_tick(epoch, sample(&[("fall", 0.9)]));
        let mut events = state.events();
        let mut snapshots = state.subscribe();
        snapshots.borrow_and_update();

        assert!(state.begin_stop());
        snapshots.borrow_and_update();
        let outcome = state.apply_tick(epoch, sample(&[("fall", 0.95)]));

        assert_eq!(outcome, TickOutcome::Discarded);
        assert!(events.try_recv().is_err());
        assert!(!snapshots.has_changed().unwrap());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.state, SessionState::Stopping);
        assert_eq!(snapshot.stats.fall_event_count, 1);
    }

    #[test]
    fn stale_tick_after_restart_is_discarded() {
        let (state, old_epoch) = running_state();
        state.begin_stop();
        state.finish_stop(true);
        state.begin_start().unwrap();
        let (new_epoch, _) = state.enter_running(false).unwrap();

        assert_eq!(
            state.apply_tick(old_epoch, sample(&[("fall", 0.9)])),
            TickOutcome::Discarded
        );
        assert!(matches!(
            state.apply_tick(new_epoch, sample(&[("fall", 0.9)])),
            TickOutcome::Applied { fall_event_count: Some(1), .. }
        ));
    }

    #[test]
    fn fall_tick_emits_event_with_peak_confidence() {
        let (state, epoch) = running_state();
        let mut events = state.events();

        state.apply_tick(epoch, sample(&[("fall", 0.91), ("fall", 0.95), ("person", 0.99)]));

        let event = events.try_recv().unwrap();
        match event.data {
            MonitorEvent::FallDetected {
                fall_event_count,
                confidence,
                ..
            } => {
                assert_eq!(fall_event_count, 1);
                assert_eq!(confidence.value(), 0.95);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn failures_accumulate_until_next_success() {
        let (state, epoch) = running_state();

        assert_eq!(state.record_failure(epoch), Some(1));
        assert_eq!(state.record_failure(epoch), Some(2));
        assert_eq!(state.snapshot().consecutive_poll_failures, 2);
        assert_eq!(state.snapshot().state, SessionState::Running);

        state.apply_tick(epoch, sample(&[]));
        assert_eq!(state.snapshot().consecutive_poll_failures, 0);
        assert_eq!(state.record_failure(epoch + 1), None);
    }

    #[test]
    fn restart_resets_statistics() {
        let (state, epoch) = running_state();
        for _ in 0..5 {
            state.apply_tick(epoch, sample(&[("fall", 0.9)]));
        }
        assert_eq!(state.snapshot().stats.fall_event_count, 5);
        state.begin_stop();
        state.finish_stop(true);

        state.begin_start().unwrap();
        state.enter_running(false).unwrap();

        assert_eq!(state.snapshot().stats.fall_event_count, 0);
    }
}
