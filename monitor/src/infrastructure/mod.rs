// Infrastructure layer - external concerns (remote service, configuration, HTTP)
// Implements interfaces defined in application layer

pub mod config;
pub mod driven;    // Output adapters (remote inference service)
pub mod driving;   // Input adapters (status API)

pub use config::MonitorConfig;
