//! Gateway operation codes

use std::fmt;

/// Op code tagging every envelope.
///
/// The envelope keeps the raw integer; codes this client does not know
/// decode to `None` and the frame is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Event dispatch, carries `s` and `t`
    Dispatch = 0,
    /// Keepalive; also a server request for an immediate beat
    Heartbeat = 1,
    Identify = 2,
    PresenceUpdate = 3,
    VoiceStateUpdate = 4,
    Resume = 6,
    /// Server asks the client to resume
    Reconnect = 7,
    RequestGuildMembers = 8,
    /// `d` says whether the session may be resumed
    InvalidSession = 9,
    /// First frame on a connection, carries the heartbeat interval
    Hello = 10,
    HeartbeatAck = 11,
}

impl OpCode {
    const ALL: [Self; 11] = [
        Self::Dispatch,
        Self::Heartbeat,
        Self::Identify,
        Self::PresenceUpdate,
        Self::VoiceStateUpdate,
        Self::Resume,
        Self::Reconnect,
        Self::RequestGuildMembers,
        Self::InvalidSession,
        Self::Hello,
        Self::HeartbeatAck,
    ];

    #[must_use]
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_u8() == value)
    }

    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "DISPATCH",
            Self::Heartbeat => "HEARTBEAT",
            Self::Identify => "IDENTIFY",
            Self::PresenceUpdate => "PRESENCE_UPDATE",
            Self::VoiceStateUpdate => "VOICE_STATE_UPDATE",
            Self::Resume => "RESUME",
            Self::Reconnect => "RECONNECT",
            Self::RequestGuildMembers => "REQUEST_GUILD_MEMBERS",
            Self::InvalidSession => "INVALID_SESSION",
            Self::Hello => "HELLO",
            Self::HeartbeatAck => "HEARTBEAT_ACK",
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op.as_u8()
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.as_u8())
    }
}
