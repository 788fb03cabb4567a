use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::SessionId;

/// Lifecycle of a monitoring session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Starting => "Starting",
            SessionState::Running => "Running",
            SessionState::Stopping => "Stopping",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot {action} while {from:?}")]
pub struct InvalidTransition {
    pub from: SessionState,
    pub action: &'static str,
}

/// Monitoring session aggregate root
///
/// `epoch` changes every time a session begins or is torn down, so results
/// produced for an earlier session can be recognised and discarded.
#[derive(Debug, Clone)]
pub struct MonitoringSession {
    pub id: Option<SessionId>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    epoch: u64,
}

impl MonitoringSession {
    pub fn new() -> Self {
        Self {
            id: None,
            state: SessionState::Idle,
            started_at: None,
            epoch: 0,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Idle -> Starting
    pub fn begin_start(&mut self) -> Result<(), InvalidTransition> {
        match self.state {
            SessionState::Idle => {
                self.state = SessionState::Starting;
                Ok(())
            }
            from => Err(InvalidTransition { from, action: "start" }),
        }
    }

    /// Starting -> Running; returns the epoch owned by the new session
    pub fn mark_running(&mut self) -> Result<u64, InvalidTransition> {
        if self.state != SessionState::Starting {
            return Err(InvalidTransition {
                from: self.state,
                action: "mark running",
            });
        }
        self.epoch += 1;
        self.id = Some(SessionId::generate());
        self.state = SessionState::Running;
        self.started_at = Some(Utc::now());
        Ok(self.epoch)
    }

    /// Starting -> Idle after a failed remote start
    pub fn abort_start(&mut self) {
        if self.state == SessionState::Starting {
            self.state = SessionState::Idle;
        }
    }

    /// Running/Starting -> Stopping. Returns false when there was nothing to stop.
    pub fn begin_stop(&mut self) -> bool {
        match self.state {
            SessionState::Running | SessionState::Starting => {
                self.epoch += 1;
                self.state = SessionState::Stopping;
                true
            }
            SessionState::Stopping | SessionState::Idle => false,
        }
    }

    /// Any state -> Idle
    pub fn mark_idle(&mut self) {
        self.state = SessionState::Idle;
        self.id = None;
        self.started_at = None;
    }

    /// Whether a result produced under `epoch` still belongs to the live session
    pub fn accepts(&self, epoch: u64) -> bool {
        self.state == SessionState::Running && self.epoch == epoch
    }
}

impl Default for MonitoringSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_creation() {
        let session = MonitoringSession::new();

        assert_eq!(session.state, SessionState::Idle);
        assert!(session.id.is_none());
        assert!(session.started_at.is_none());
    }

    #[test]
    fn test_session_lifecycle() {
        let mut session = MonitoringSession::new();

        session.begin_start().unwrap();
        assert_eq!(session.state, SessionState::Starting);

        let epoch = session.mark_running().unwrap();
        assert_eq!(session.state, SessionState::Running);
        assert!(session.started_at.is_some());
        assert!(session.accepts(epoch));

        assert!(session.begin_stop());
        assert_eq!(session.state, SessionState::Stopping);
        assert!(!session.accepts(epoch));

        session.mark_idle();
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.id.is_none());
    }

    #[test]
    fn test_start_rejected_unless_idle() {
        let mut session = MonitoringSession::new();
        session.begin_start().unwrap();

        let err = session.begin_start().unwrap_err();
        assert_eq!(err.from, SessionState::Starting);

        session.mark_running().unwrap();
        assert!(session.begin_start().is_err());
    }

    #[test]
    fn test_failed_start_returns_to_idle() {
        let mut session = MonitoringSession::new();
        session.begin_start().unwrap();
        session.abort_start();

        assert_eq!(session.state, SessionState::Idle);
        assert!(session.begin_start().is_ok());
    }

    #[test]
    fn test_stop_from_idle_is_noop() {
        let mut session = MonitoringSession::new();
        let epoch = session.epoch();

        assert!(!session.begin_stop());
        assert_eq!(session.state, SessionState::Idle);
        assert_eq!(session.epoch(), epoch);
    }

    #[test]
    fn test_each_session_gets_fresh_epoch_and_id() {
        let mut session = MonitoringSession::new();
        session.begin_start().unwrap();
        let first_epoch = session.mark_running().unwrap();
        let first_id = session.id;
        session.begin_stop();
        session.mark_idle();

        session.begin_start().unwrap();
        let second_epoch = session.mark_running().unwrap();

        assert_ne!(first_epoch, second_epoch);
        assert_ne!(first_id, session.id);
        assert!(!session.accepts(first_epoch));
    }
}
