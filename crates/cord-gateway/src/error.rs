//! Gateway error types

use crate::protocol::CloseCode;
use thiserror::Error;

/// Errors that end a gateway session.
///
/// Reconnect requests and resumable invalid sessions are absorbed by the
/// session itself and never show up here.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A received frame could not be decoded
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    /// The server invalidated the session and it cannot be resumed
    #[error("Session invalidated by the gateway (not resumable)")]
    FatalInvalidSession,

    /// The server closed the connection with a code that forbids reconnecting
    #[error("Gateway closed the connection: {code} {reason}")]
    Closed { code: u16, reason: String },

    /// The transport kept dropping and reconnect attempts ran out
    #[error("Connection lost after {attempts} reconnect attempts")]
    ConnectionLost { attempts: u32 },

    /// WebSocket transport failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// `connect` was called while a session is already running
    #[error("Session already running")]
    AlreadyRunning,
}

impl GatewayError {
    /// Build a `Closed` error from a raw close frame
    #[must_use]
    pub fn closed(code: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = match (reason.is_empty(), CloseCode::from_u16(code)) {
            (true, Some(known)) => known.description().to_string(),
            _ => reason,
        };
        Self::Closed { code, reason }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Gateway result type
pub type GatewayResult<T> = Result<T, GatewayError>;
