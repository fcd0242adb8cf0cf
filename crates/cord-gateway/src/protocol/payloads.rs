//! Typed payload definitions
//!
//! The `d` field of the handshake envelopes exchanged with the gateway.

use super::GatewayIntents;
use crate::events::User;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    /// Create a Hello payload with the given interval
    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

/// Client connection properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    /// Operating system
    #[serde(rename = "$os")]
    pub os: String,

    /// Library name
    #[serde(rename = "$browser", skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,

    /// Library name (again, the gateway asks for both)
    #[serde(rename = "$device", skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
}

impl ConnectionProperties {
    /// Properties reporting only the operating system
    #[must_use]
    pub fn new(os: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            browser: None,
            device: None,
        }
    }

    /// Set browser
    #[must_use]
    pub fn with_browser(mut self, browser: impl Into<String>) -> Self {
        self.browser = Some(browser.into());
        self
    }

    /// Set device type
    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }
}

/// Payload for op 2 (Identify)
///
/// Built once per fresh session and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifyPayload {
    pub token: String,
    pub properties: ConnectionProperties,
    pub intents: GatewayIntents,
    pub compress: bool,
    pub large_threshold: u32,
    pub shard: Option<[u32; 2]>,
    pub presence: Option<Value>,
}

impl IdentifyPayload {
    /// Default `large_threshold`
    pub const DEFAULT_LARGE_THRESHOLD: u32 = 50;

    /// Create an Identify payload with the default options
    #[must_use]
    pub fn new(
        token: impl Into<String>,
        properties: ConnectionProperties,
        intents: GatewayIntents,
    ) -> Self {
        Self {
            token: token.into(),
            properties,
            intents,
            compress: false,
            large_threshold: Self::DEFAULT_LARGE_THRESHOLD,
            shard: None,
            presence: None,
        }
    }

    #[must_use]
    pub fn with_large_threshold(mut self, large_threshold: u32) -> Self {
        self.large_threshold = large_threshold;
        self
    }

    #[must_use]
    pub fn with_shard(mut self, shard_id: u32, shard_count: u32) -> Self {
        self.shard = Some([shard_id, shard_count]);
        self
    }

    #[must_use]
    pub fn with_presence(mut self, presence: Value) -> Self {
        self.presence = Some(presence);
        self
    }

    /// The `d` object sent on the wire; `shard` and `presence` are omitted when unset
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut data = json!({
            "token": self.token,
            "intents": self.intents.bits(),
            "properties": self.properties,
            "compress": self.compress,
            "large_threshold": self.large_threshold,
        });

        if let Value::Object(map) = &mut data {
            if let Some(shard) = self.shard {
                map.insert("shard".to_string(), json!(shard));
            }
            if let Some(presence) = &self.presence {
                map.insert("presence".to_string(), presence.clone());
            }
        }

        data
    }
}

/// Payload for op 6 (Resume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumePayload {
    /// Authentication token
    pub token: String,

    /// Session ID to resume
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}

/// READY dispatch payload
///
/// Only the fields the session needs; the full object is still published raw.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadyPayload {
    /// Gateway protocol version
    #[serde(default)]
    pub v: Option<u8>,

    /// Current user
    pub user: User,

    /// Session ID for resuming
    pub session_id: String,

    /// Gateway URL to use when resuming
    #[serde(default)]
    pub resume_gateway_url: Option<String>,
}
