pub mod http;

pub use http::create_status_router;
