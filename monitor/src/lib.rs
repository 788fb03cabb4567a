//! Live monitoring session controller for a remote fall-detection service.
//!
//! A [`SessionController`] starts a session on the remote service, polls the
//! latest annotated frame and detections on a fixed cadence, folds them into
//! running statistics and publishes a [`LiveSnapshot`] for display.

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use application::live::{ControllerSettings, LiveSnapshot, SessionController};
pub use application::MonitorError;
