//! Bot behaviour

use async_trait::async_trait;
use cord_gateway::{Context, EventHandler, Message};
use cord_rest::RestClient;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};

/// Guild text channel type
const GUILD_TEXT: u64 = 0;

/// What to do with an incoming message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Answer in the same channel
    Say(&'static str),
    /// Close the gateway session
    Shutdown,
}

/// Decide how to react to `content`
pub fn reply_for(content: &str) -> Option<Reply> {
    let content = content.trim();
    if content.eq_ignore_ascii_case("shutdown") {
        return Some(Reply::Shutdown);
    }
    if content.to_lowercase().contains("ping") {
        return Some(Reply::Say("pong"));
    }
    None
}

/// Find a text channel called `name` in the first guild that has one
pub async fn find_channel(rest: &RestClient, name: &str) -> anyhow::Result<Option<String>> {
    let guilds = rest.get_current_user_guilds().await?;

    for guild in guilds.as_array().into_iter().flatten() {
        let Some(guild_id) = guild["id"].as_str() else {
            continue;
        };
        let channels = rest.get_guild_channels(guild_id).await?;
        if let Some(id) = channel_named(&channels, name) {
            return Ok(Some(id));
        }
    }
    Ok(None)
}

fn channel_named(channels: &Value, name: &str) -> Option<String> {
    channels
        .as_array()?
        .iter()
        .find(|c| c["name"] == name && c["type"].as_u64().unwrap_or(GUILD_TEXT) == GUILD_TEXT)
        .and_then(|c| c["id"].as_str())
        .map(str::to_string)
}

/// Greets once, answers "ping", closes on "shutdown"
pub struct PingBot {
    rest: RestClient,
    announce_channel: Option<String>,
    greeted: AtomicBool,
}

impl PingBot {
    pub fn new(rest: RestClient, announce_channel: Option<String>) -> Self {
        Self {
            rest,
            announce_channel,
            greeted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl EventHandler for PingBot {
    async fn on_connect(&self, _ctx: Context) -> anyhow::Result<()> {
        let Some(channel_id) = &self.announce_channel else {
            return Ok(());
        };
        // Reconnects fire on_connect again
        if self.greeted.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.rest.create_message(channel_id, "Ready.").await?;
        tracing::info!(channel_id = %channel_id, "Greeting posted");
        Ok(())
    }

    async fn on_message(&self, ctx: Context, message: Message) -> anyhow::Result<()> {
        let me = ctx.current_user();
        if message.author.bot || me.is_some_and(|me| message.is_from(&me.id)) {
            return Ok(());
        }

        match reply_for(&message.content) {
            Some(Reply::Say(text)) => {
                self.rest.create_message(&message.channel_id, text).await?;
                tracing::debug!(channel_id = %message.channel_id, reply = text, "Replied");
            }
            Some(Reply::Shutdown) => {
                tracing::info!(author = %message.author.username, "Shutdown requested");
                ctx.close();
            }
            None => {}
        }
        Ok(())
    }
}
