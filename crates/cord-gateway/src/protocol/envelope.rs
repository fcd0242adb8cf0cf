//! Gateway envelope format
//!
//! Every text frame on the gateway carries exactly one envelope:
//! `{"op": <int>, "d": <any>, "s": <int|null>, "t": <string|null>}`.

use super::{HelloPayload, IdentifyPayload, OpCode, ResumePayload};
use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One gateway frame.
///
/// The op code is kept as the raw integer so frames with op codes this
/// client does not know still decode (and are then ignored).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Raw operation code; any JSON integer is accepted
    pub op: i64,

    /// Event data
    #[serde(default)]
    pub d: Value,

    /// Sequence number (dispatches only)
    #[serde(default)]
    pub s: Option<u64>,

    /// Event name (dispatches only)
    #[serde(default)]
    pub t: Option<String>,
}

impl Envelope {
    /// Build an envelope with no sequence or event name
    #[must_use]
    pub fn new(op: OpCode, d: Value) -> Self {
        Self {
            op: i64::from(op.as_u8()),
            d,
            s: None,
            t: None,
        }
    }

    /// The decoded op code, if known
    #[must_use]
    pub fn opcode(&self) -> Option<OpCode> {
        u8::try_from(self.op).ok().and_then(OpCode::from_u8)
    }

    // === Client frames ===

    /// Heartbeat (op=1) carrying the last seen sequence, or null before the first one
    #[must_use]
    pub fn heartbeat(last_sequence: Option<u64>) -> Self {
        Self::new(OpCode::Heartbeat, last_sequence.map_or(Value::Null, Value::from))
    }

    /// Identify (op=2)
    #[must_use]
    pub fn identify(payload: &IdentifyPayload) -> Self {
        Self::new(OpCode::Identify, payload.to_value())
    }

    /// Resume (op=6)
    #[must_use]
    pub fn resume(payload: &ResumePayload) -> Self {
        Self::new(
            OpCode::Resume,
            json!({
                "token": payload.token,
                "session_id": payload.session_id,
                "seq": payload.seq,
            }),
        )
    }

    // === Server frames (used by tests and mock servers) ===

    /// Hello (op=10)
    #[must_use]
    pub fn hello(payload: HelloPayload) -> Self {
        Self::new(
            OpCode::Hello,
            json!({ "heartbeat_interval": payload.heartbeat_interval }),
        )
    }

    /// Dispatch (op=0)
    #[must_use]
    pub fn dispatch(event: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: i64::from(OpCode::Dispatch.as_u8()),
            d: data,
            s: Some(sequence),
            t: Some(event.into()),
        }
    }

    /// Invalid Session (op=9)
    #[must_use]
    pub fn invalid_session(resumable: bool) -> Self {
        Self::new(OpCode::InvalidSession, Value::Bool(resumable))
    }

    // === Codec ===

    /// Serialize to the wire representation.
    ///
    /// All four keys are always present; `s` and `t` are `null` when absent.
    #[must_use]
    pub fn to_json(&self) -> String {
        json!({
            "op": self.op,
            "d": self.d,
            "s": self.s,
            "t": self.t,
        })
        .to_string()
    }

    /// Parse a text frame.
    ///
    /// Only `op` is required; missing `d`, `s` and `t` decode as null.
    pub fn from_json(raw: &str) -> GatewayResult<Self> {
        serde_json::from_str(raw).map_err(|e| GatewayError::MalformedPayload(e.to_string()))
    }

    /// Interpret `d` as a typed payload
    pub fn data_as<T: serde::de::DeserializeOwned>(&self) -> GatewayResult<T> {
        T::deserialize(&self.d).map_err(|e| {
            GatewayError::MalformedPayload(format!("op {} payload: {e}", self.op))
        })
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.opcode() {
            Some(op) => write!(f, "Envelope(op={op}")?,
            None => write!(f, "Envelope(op={}", self.op)?,
        }
        if let Some(t) = &self.t {
            write!(f, ", t={t}")?;
        }
        if let Some(s) = self.s {
            write!(f, ", s={s}")?;
        }
        write!(f, ")")
    }
}
