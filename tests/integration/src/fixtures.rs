//! Test fixtures
//!
//! Gateway frames as a real server would send them.

use cord_gateway::protocol::Envelope;
use serde_json::json;

/// Token the tests identify with
pub const TEST_TOKEN: &str = "test-token";

/// Id of the bot user in READY
pub const BOT_USER_ID: &str = "1";

/// READY dispatch for `session_id`
pub fn ready(seq: u64, session_id: &str, resume_url: Option<&str>) -> Envelope {
    Envelope::dispatch(
        "READY",
        seq,
        json!({
            "v": 9,
            "user": {"id": BOT_USER_ID, "username": "bot", "discriminator": "0", "bot": true},
            "guilds": [{"id": "100", "unavailable": true}],
            "session_id": session_id,
            "resume_gateway_url": resume_url,
        }),
    )
}

/// RESUMED dispatch
pub fn resumed(seq: u64) -> Envelope {
    Envelope::dispatch("RESUMED", seq, json!(null))
}

/// MESSAGE_CREATE dispatch from user 2
pub fn message_create(seq: u64, content: &str) -> Envelope {
    Envelope::dispatch(
        "MESSAGE_CREATE",
        seq,
        json!({
            "id": format!("m{seq}"),
            "channel_id": "200",
            "guild_id": "100",
            "author": {"id": "2", "username": "alice"},
            "content": content,
            "mentions": [],
            "timestamp": "2024-01-01T00:00:00+00:00"
        }),
    )
}

/// Some other dispatch, only visible to raw bus subscribers
pub fn guild_create(seq: u64) -> Envelope {
    Envelope::dispatch(
        "GUILD_CREATE",
        seq,
        json!({"id": "100", "name": "Test Guild", "channels": []}),
    )
}
