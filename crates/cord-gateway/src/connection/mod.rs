//! Connection management
//!
//! Session state, the protocol state machine, the heartbeat task and the
//! driver that runs them over a WebSocket.

mod driver;
mod heartbeat;
mod machine;
mod session;

pub use driver::{DriverSettings, SessionDriver};
pub use heartbeat::{HeartbeatExit, HeartbeatMonitor};
pub use machine::{Action, SessionMachine, DEFAULT_INVALID_SESSION_BACKOFF};
pub use session::{SessionHandle, SessionState};
