//! # cord-gateway
//!
//! Client for the real-time chat gateway: a WebSocket session that keeps
//! itself alive with heartbeats, authenticates with Identify, resumes after
//! drops, and fans dispatched events out to subscribers.

pub mod client;
pub mod connection;
pub mod error;
pub mod events;
pub mod protocol;

pub use client::{Context, EventHandler, GatewayClient, NoopHandler};
pub use connection::{SessionHandle, SessionState};
pub use error::{GatewayError, GatewayResult};
pub use events::{EventBus, GatewayEventType, Listener, ListenerId, Message, User};
pub use protocol::{Envelope, GatewayIntents, OpCode};
