// Application layer - live monitoring use cases
// Orchestrates domain logic, depends on domain layer only

pub mod error;
pub mod live;
pub mod ports;

pub use error::MonitorError;
