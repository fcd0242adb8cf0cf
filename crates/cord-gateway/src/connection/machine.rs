//! Session state machine
//!
//! Interprets inbound envelopes and decides what the connection should do
//! next. It performs no I/O: each frame turns into a list of [`Action`]s that
//! the driver carries out in order.

use super::session::{SessionHandle, SessionState};
use crate::error::{GatewayError, GatewayResult};
use crate::events::GatewayEventType;
use crate::protocol::{Envelope, HelloPayload, IdentifyPayload, OpCode, ReadyPayload, ResumePayload};
use serde_json::Value;
use std::time::Duration;

/// Default wait before re-identifying after a resumable invalid session
pub const DEFAULT_INVALID_SESSION_BACKOFF: Duration = Duration::from_secs(5);

/// Something the connection has to do in response to a frame
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// (Re)start the heartbeat monitor with this interval
    StartHeartbeat(Duration),
    /// Send a frame now
    Send(Envelope),
    /// Send a frame after a delay, unless the session closes first
    SendAfter(Duration, Envelope),
    /// Publish a payload to the event bus
    Publish { event: String, data: Value },
}

/// Per-session protocol logic
#[derive(Debug)]
pub struct SessionMachine {
    session: SessionHandle,
    identify: IdentifyPayload,
    invalid_session_backoff: Duration,
}

impl SessionMachine {
    /// Create a machine for `session`, identifying with `identify`
    #[must_use]
    pub fn new(session: SessionHandle, identify: IdentifyPayload) -> Self {
        Self {
            session,
            identify,
            invalid_session_backoff: DEFAULT_INVALID_SESSION_BACKOFF,
        }
    }

    #[must_use]
    pub fn with_invalid_session_backoff(mut self, backoff: Duration) -> Self {
        self.invalid_session_backoff = backoff;
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// A fresh transport is open; the next Hello starts a handshake
    pub fn connection_opened(&mut self) {
        self.session.set_state(SessionState::AwaitingHello);
    }

    /// Handle one inbound envelope.
    ///
    /// The sequence number is recorded before anything else so that frames
    /// sent in response already carry it.
    ///
    /// # Errors
    /// - `MalformedPayload` when a Hello or READY payload cannot be decoded
    /// - `FatalInvalidSession` when the gateway refuses the session for good
    pub fn handle(&mut self, envelope: Envelope) -> GatewayResult<Vec<Action>> {
        if let Some(seq) = envelope.s {
            self.session.observe_sequence(seq);
        }

        let Some(op) = envelope.opcode() else {
            tracing::debug!(op = envelope.op, "Ignoring unknown op code");
            return Ok(Vec::new());
        };

        match op {
            OpCode::Hello => self.on_hello(&envelope),
            OpCode::Dispatch => self.on_dispatch(envelope),
            OpCode::Heartbeat => Ok(vec![Action::Send(self.heartbeat_frame())]),
            OpCode::HeartbeatAck => {
                self.session.ack_heartbeat();
                tracing::trace!("Heartbeat acknowledged");
                Ok(Vec::new())
            }
            OpCode::Reconnect => Ok(self.on_reconnect()),
            OpCode::InvalidSession => self.on_invalid_session(&envelope.d),
            other => {
                tracing::debug!(op = %other, "Ignoring op code not sent by the gateway");
                Ok(Vec::new())
            }
        }
    }

    // === Frames ===

    /// Heartbeat carrying the last seen sequence
    #[must_use]
    pub fn heartbeat_frame(&self) -> Envelope {
        Envelope::heartbeat(self.session.last_sequence())
    }

    #[must_use]
    pub fn identify_frame(&self) -> Envelope {
        Envelope::identify(&self.identify)
    }

    /// Resume frame for the current session, if one was established
    #[must_use]
    pub fn resume_frame(&self) -> Option<Envelope> {
        self.session.session_id().map(|session_id| {
            Envelope::resume(&ResumePayload {
                token: self.identify.token.clone(),
                session_id,
                seq: self.session.last_sequence().unwrap_or(0),
            })
        })
    }

    // === Handlers ===

    fn on_hello(&mut self, envelope: &Envelope) -> GatewayResult<Vec<Action>> {
        if self.session.state() != SessionState::AwaitingHello {
            tracing::debug!(state = %self.session.state(), "Ignoring repeated Hello");
            return Ok(Vec::new());
        }

        let hello: HelloPayload = envelope.data_as()?;
        if hello.heartbeat_interval == 0 {
            return Err(GatewayError::MalformedPayload(
                "Hello heartbeat_interval must be positive".to_string(),
            ));
        }
        let interval = Duration::from_millis(hello.heartbeat_interval);
        tracing::debug!(interval_ms = hello.heartbeat_interval, "Hello received");

        let handshake = match self.resume_frame() {
            Some(resume) => {
                self.session.set_state(SessionState::Resuming);
                resume
            }
            None => {
                self.session.set_state(SessionState::Identifying);
                self.identify_frame()
            }
        };

        Ok(vec![Action::StartHeartbeat(interval), Action::Send(handshake)])
    }

    fn on_dispatch(&mut self, envelope: Envelope) -> GatewayResult<Vec<Action>> {
        let Some(name) = envelope.t else {
            tracing::warn!(seq = ?envelope.s, "Dispatch without an event name");
            return Ok(Vec::new());
        };
        let kind = GatewayEventType::from_str(&name);

        match kind {
            Some(GatewayEventType::Ready) => {
                let ready: ReadyPayload = serde_json::from_value(envelope.d).map_err(|e| {
                    GatewayError::MalformedPayload(format!("READY payload: {e}"))
                })?;
                tracing::info!(
                    session_id = %ready.session_id,
                    user = %ready.user.username,
                    version = ?ready.v,
                    "Session ready"
                );
                self.session
                    .set_ready(ready.session_id, ready.user, ready.resume_gateway_url);
                self.session.set_state(SessionState::Active);
                Ok(Vec::new())
            }
            Some(GatewayEventType::Resumed) => {
                tracing::info!(seq = ?self.session.last_sequence(), "Session resumed");
                self.session.set_state(SessionState::Active);
                Ok(Vec::new())
            }
            _ => {
                let raw = Action::Publish {
                    event: name,
                    data: envelope.d.clone(),
                };
                Ok(match kind.and_then(GatewayEventType::hook_name) {
                    Some(hook) => vec![
                        raw,
                        Action::Publish {
                            event: hook.to_string(),
                            data: envelope.d,
                        },
                    ],
                    None => vec![raw],
                })
            }
        }
    }

    fn on_reconnect(&mut self) -> Vec<Action> {
        match self.resume_frame() {
            Some(resume) => {
                tracing::info!("Gateway requested reconnect, resuming");
                self.session.set_state(SessionState::Resuming);
                vec![Action::Send(resume)]
            }
            None => {
                tracing::info!("Gateway requested reconnect before READY, identifying");
                self.session.set_state(SessionState::Identifying);
                vec![Action::Send(self.identify_frame())]
            }
        }
    }

    fn on_invalid_session(&mut self, data: &Value) -> GatewayResult<Vec<Action>> {
        if *data == Value::Bool(false) {
            tracing::error!("Session invalidated and not resumable");
            self.session.set_state(SessionState::Closed);
            self.session.close();
            return Err(GatewayError::FatalInvalidSession);
        }

        tracing::warn!(
            backoff_ms = self.invalid_session_backoff.as_millis(),
            "Session invalidated, re-identifying"
        );
        self.session.clear_session_id();
        self.session.set_state(SessionState::Identifying);

        Ok(vec![Action::SendAfter(
            self.invalid_session_backoff,
            self.identify_frame(),
        )])
    }
}
