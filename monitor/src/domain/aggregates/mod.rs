pub mod monitoring_session;
pub mod detection_stats;

pub use monitoring_session::{InvalidTransition, MonitoringSession, SessionState};
pub use detection_stats::{AggregateStats, DetectionAggregator};
