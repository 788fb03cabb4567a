mod protocol;

pub use protocol::*;
