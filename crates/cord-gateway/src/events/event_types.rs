//! Gateway event names
//!
//! Names carried in the `t` field of dispatch envelopes, plus the fixed bus
//! names the client façade binds its hooks to.

use std::fmt;

/// Bus event fired whenever the transport (re)opens
pub const ON_CONNECT: &str = "on_connect";

/// Bus event fired for every MESSAGE_CREATE dispatch
pub const ON_MESSAGE: &str = "on_message";

/// Dispatches the session treats specially.
///
/// Everything else is published to the bus under its raw name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayEventType {
    /// Identify succeeded; carries the session id and user
    Ready,
    /// Resume succeeded
    Resumed,
    MessageCreate,
}

impl GatewayEventType {
    const ALL: [Self; 3] = [Self::Ready, Self::Resumed, Self::MessageCreate];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Resumed => "RESUMED",
            Self::MessageCreate => "MESSAGE_CREATE",
        }
    }

    /// Parse from the dispatch name
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// The façade hook this event is additionally published under, if any
    #[must_use]
    pub const fn hook_name(self) -> Option<&'static str> {
        match self {
            Self::MessageCreate => Some(ON_MESSAGE),
            _ => None,
        }
    }
}

impl fmt::Display for GatewayEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
