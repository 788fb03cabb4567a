pub mod http_monitoring_client;

pub use http_monitoring_client::HttpMonitoringClient;
