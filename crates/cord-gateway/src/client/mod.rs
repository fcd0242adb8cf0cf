//! Client façade
//!
//! [`GatewayClient`] ties the event bus and the session driver together and
//! exposes the [`EventHandler`] hooks bots implement.

mod context;
mod gateway_client;
mod handler;

pub use context::Context;
pub use gateway_client::GatewayClient;
pub use handler::{EventHandler, NoopHandler};
