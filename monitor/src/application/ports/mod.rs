// Application ports - Driven ports (output ports implemented by infrastructure)

pub mod monitoring_service;

pub use monitoring_service::{FrameSample, MonitoringServicePort, StartOutcome, StopOutcome};

#[cfg(test)]
pub use monitoring_service::MockMonitoringServicePort;
