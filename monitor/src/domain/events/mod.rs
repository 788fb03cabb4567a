pub mod domain_event;
pub mod monitor_event;

pub use domain_event::DomainEvent;
pub use monitor_event::MonitorEvent;
