use chrono::{DateTime, Utc};

use crate::domain::aggregates::{AggregateStats, SessionState};
use crate::domain::value_objects::{Detection, Frame, SessionId};

/// Read model handed to the presentation layer
#[derive(Debug, Clone)]
pub struct LiveSnapshot {
    pub session_id: Option<SessionId>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub current_frame: Option<Frame>,
    pub current_detections: Vec<Detection>,
    pub stats: AggregateStats,
    /// Resets on the next successful tick
    pub consecutive_poll_failures: u32,
}

impl LiveSnapshot {
    pub fn idle() -> Self {
        Self {
            session_id: None,
            state: SessionState::Idle,
            started_at: None,
            current_frame: None,
            current_detections: Vec::new(),
            stats: AggregateStats::default(),
            consecutive_poll_failures: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == SessionState::Running
    }
}

impl Default for LiveSnapshot {
    fn default() -> Self {
        Self::idle()
    }
}
