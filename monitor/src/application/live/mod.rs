pub mod frame_poller;
pub mod live_state;
pub mod session_controller;
pub mod snapshot;

pub use frame_poller::{FramePoller, PollerHandle, DEFAULT_POLL_INTERVAL};
pub use live_state::{LiveState, TickOutcome};
pub use session_controller::{ControllerSettings, SessionController};
pub use snapshot::LiveSnapshot;
