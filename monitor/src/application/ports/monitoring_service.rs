use async_trait::async_trait;

use crate::application::MonitorError;
use crate::domain::value_objects::{Detection, Frame};

/// Result of asking the remote service to start inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    Rejected(String),
}

/// Result of asking the remote service to stop inference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
    Rejected(String),
}

/// One poll: the annotated frame and the detections found in it
#[derive(Debug, Clone)]
pub struct FrameSample {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

/// Port for the remote monitoring backend (implemented by infrastructure)
///
/// Every call is a single request/response. Retry and timeout policy belongs
/// to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MonitoringServicePort: Send + Sync {
    async fn start(&self) -> Result<StartOutcome, MonitorError>;

    async fn stop(&self) -> Result<StopOutcome, MonitorError>;

    async fn poll_frame(&self) -> Result<FrameSample, MonitorError>;

    /// Direct stream URL for consumers that do not poll
    async fn stream_url(&self) -> Result<String, MonitorError>;
}
