//! Dispatch data models
//!
//! Lenient views of the objects the façade hands to bot hooks. Unknown fields
//! are ignored and most fields default, so partial payloads still parse.

use serde::{Deserialize, Serialize};

/// A user as it appears in READY and message payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Snowflake, as a string
    pub id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub global_name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub bot: bool,
}

/// MESSAGE_CREATE payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    #[serde(default)]
    pub guild_id: Option<String>,
    pub author: User,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub mentions: Vec<User>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Message {
    /// Whether `user_id` is mentioned in this message
    #[must_use]
    pub fn mentions_user(&self, user_id: &str) -> bool {
        self.mentions.iter().any(|u| u.id == user_id)
    }

    /// Whether the message was written by `user_id`
    #[must_use]
    pub fn is_from(&self, user_id: &str) -> bool {
        self.author.id == user_id
    }
}
