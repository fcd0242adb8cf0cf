//! Endpoint wrappers
//!
//! One method per API endpoint, grouped by resource.

mod channels;
mod gateway;
mod guilds;
mod users;

pub use channels::{MessageAnchor, MessagesQuery};
