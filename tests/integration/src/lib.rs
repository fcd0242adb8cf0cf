//! Integration test utilities
//!
//! A scripted mock gateway, a mock REST API, and fixtures for driving the
//! client end to end over real sockets.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;
