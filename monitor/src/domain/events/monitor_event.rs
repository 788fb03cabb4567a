use serde::Serialize;

use crate::domain::value_objects::{Confidence, SessionId};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MonitorEvent {
    SessionStarted {
        session_id: SessionId,
        /// The remote service was already running when we asked it to start
        already_running: bool,
    },
    FallDetected {
        session_id: SessionId,
        fall_event_count: u64,
        /// Highest fall confidence within the tick
        confidence: Confidence,
    },
    SessionStopped {
        session_id: SessionId,
        remote_acknowledged: bool,
    },
}
