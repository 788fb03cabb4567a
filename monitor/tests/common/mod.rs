#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use fall_monitor::application::ports::{
    FrameSample, MonitoringServicePort, StartOutcome, StopOutcome,
};
use fall_monitor::domain::value_objects::{Confidence, Detection, Frame};
use fall_monitor::MonitorError;

/// In-memory stand-in for the remote service, answering polls from a script
pub struct ScriptedService {
    start_outcome: Mutex<Result<StartOutcome, MonitorError>>,
    start_delay: Duration,
    frames: Mutex<VecDeque<Vec<(&'static str, f64)>>>,
    poll_gate: Option<Arc<Notify>>,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub polls: AtomicUsize,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self {
            start_outcome: Mutex::new(Ok(StartOutcome::Started)),
            start_delay: Duration::ZERO,
            frames: Mutex::new(VecDeque::new()),
            poll_gate: None,
            start_calls: AtomicUsize::new(0),
            stop_calls: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn with_start_outcome(self, outcome: Result<StartOutcome, MonitorError>) -> Self {
        *self.start_outcome.lock().unwrap() = outcome;
        self
    }

    /// Polls block until the gate is notified
    pub fn with_poll_gate(mut self, gate: Arc<Notify>) -> Self {
        self.poll_gate = Some(gate);
        self
    }

    /// Queues one detection batch per future tick
    pub fn push_frames(&self, batches: Vec<Vec<(&'static str, f64)>>) {
        self.frames.lock().unwrap().extend(batches);
    }

    pub fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MonitoringServicePort for ScriptedService {
    async fn start(&self) -> Result<StartOutcome, MonitorError> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        self.start_outcome.lock().unwrap().clone()
    }

    async fn stop(&self) -> Result<StopOutcome, MonitorError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        Ok(StopOutcome::Stopped)
    }

    async fn poll_frame(&self) -> Result<FrameSample, MonitorError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.poll_gate {
            gate.notified().await;
        }

        let batch = self
            .frames
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MonitorError::RemoteRejected("500 Failed to read frame".to_string()))?;

        Ok(FrameSample {
            frame: Frame::new(vec![0xff, 0xd8, 0xff, 0xd9], Utc::now()),
            detections: batch
                .into_iter()
                .map(|(class, conf)| Detection::new(class, Confidence::new(conf).unwrap()))
                .collect(),
        })
    }

    async fn stream_url(&self) -> Result<String, MonitorError> {
        Ok("rtsp://camera.local:554/stream1".to_string())
    }
}
