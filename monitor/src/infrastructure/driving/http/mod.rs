pub mod status_api;

pub use status_api::{create_status_router, SnapshotView};
