pub mod session_id;
pub mod detection;
pub mod frame;

pub use session_id::SessionId;
pub use detection::{BoundingBox, Confidence, Detection, DetectionClass};
pub use frame::Frame;
