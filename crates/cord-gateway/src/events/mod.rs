//! Gateway events
//!
//! Dispatch event names, the data models handed to hooks, and the event bus.

mod bus;
mod event_types;
mod models;

pub use bus::{EventBus, Listener, ListenerId};
pub use event_types::{GatewayEventType, ON_CONNECT, ON_MESSAGE};
pub use models::{Message, User};
