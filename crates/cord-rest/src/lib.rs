//! # cord-rest
//!
//! Thin REST client: routes, authorization headers and one method per
//! endpoint. Responses are returned as raw JSON.

mod client;
mod endpoints;
mod error;
mod route;

pub use client::{Credentials, RestClient};
pub use endpoints::{MessageAnchor, MessagesQuery};
pub use error::{RestError, RestResult};
pub use route::Route;
