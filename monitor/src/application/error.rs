use std::time::Duration;
use thiserror::Error;

use crate::domain::aggregates::InvalidTransition;

#[derive(Debug, Clone, Error)]
pub enum MonitorError {
    /// Network unreachable, connection reset, client-side failure
    #[error("transport error: {0}")]
    Transport(String),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Non-success status from the remote service, e.g. camera unavailable
    #[error("remote service rejected request: {0}")]
    RemoteRejected(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
}

impl MonitorError {
    pub fn is_transport(&self) -> bool {
        matches!(self, MonitorError::Transport(_) | MonitorError::Timeout { .. })
    }
}
