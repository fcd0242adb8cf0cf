//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file when present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub gateway: GatewayConfig,
    pub rest: RestConfig,
    pub bot: BotConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default)]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }
}

/// Gateway session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket URI of the gateway
    pub url: String,
    /// Raw intents bitmask sent in Identify
    pub intents: u64,
    /// Member count above which offline members are not sent
    pub large_threshold: u32,
    /// Operating system reported in the connection properties
    pub os: String,
    /// Wait before re-identifying after a resumable invalid session
    pub invalid_session_backoff_ms: u64,
    /// Wait before reconnecting after the transport drops
    pub reconnect_delay_ms: u64,
    /// Consecutive reconnects allowed before the session gives up
    pub max_reconnect_attempts: u32,
    /// Maximum number of subscriber callbacks running at once
    pub event_concurrency: usize,
    /// Capacity of the outbound frame queue
    pub outbound_buffer: usize,
    /// Treat an unacknowledged heartbeat as a dead connection
    pub zombie_detection: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
            intents: default_intents(),
            large_threshold: default_large_threshold(),
            os: env::consts::OS.to_string(),
            invalid_session_backoff_ms: default_invalid_session_backoff_ms(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            event_concurrency: default_event_concurrency(),
            outbound_buffer: default_outbound_buffer(),
            zombie_detection: true,
        }
    }
}

/// REST API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RestConfig {
    /// Versioned API base URL, e.g. `https://discord.com/api/v9`
    pub api_base: String,
    pub user_agent: String,
}

impl Default for RestConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            user_agent: default_user_agent(),
        }
    }
}

/// Settings for the bundled bot binary
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub token: String,
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
}

// Default value functions
fn default_app_name() -> String {
    "cord".to_string()
}

fn default_gateway_url() -> String {
    "wss://gateway.discord.gg/?v=9&encoding=json".to_string()
}

fn default_intents() -> u64 {
    // GUILDS | GUILD_MESSAGES
    (1 << 0) | (1 << 9)
}

fn default_large_threshold() -> u32 {
    50
}

fn default_invalid_session_backoff_ms() -> u64 {
    5_000
}

fn default_reconnect_delay_ms() -> u64 {
    1_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_event_concurrency() -> usize {
    64
}

fn default_outbound_buffer() -> usize {
    100
}

fn default_api_base() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_user_agent() -> String {
    "DiscordBot".to_string()
}

fn default_channel_name() -> String {
    "general".to_string()
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_or<T, F>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            app: AppSettings {
                name: lookup("APP_NAME").unwrap_or_else(default_app_name),
                env: lookup("APP_ENV")
                    .and_then(|s| Environment::parse(&s))
                    .unwrap_or_default(),
            },
            gateway: GatewayConfig::from_lookup(&lookup)?,
            rest: RestConfig {
                api_base: lookup("REST_API_BASE").unwrap_or_else(default_api_base),
                user_agent: lookup("REST_USER_AGENT").unwrap_or_else(default_user_agent),
            },
            bot: BotConfig {
                token: lookup("BOT_TOKEN")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .ok_or(ConfigError::MissingVar("BOT_TOKEN"))?,
                channel_name: lookup("BOT_CHANNEL_NAME").unwrap_or_else(default_channel_name),
            },
        })
    }
}

impl GatewayConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        Ok(Self {
            url: lookup("GATEWAY_URL").unwrap_or(defaults.url),
            intents: parse_or(lookup, "GATEWAY_INTENTS", defaults.intents)?,
            large_threshold: parse_or(lookup, "GATEWAY_LARGE_THRESHOLD", defaults.large_threshold)?,
            os: lookup("GATEWAY_OS").unwrap_or(defaults.os),
            invalid_session_backoff_ms: parse_or(
                lookup,
                "GATEWAY_INVALID_SESSION_BACKOFF_MS",
                defaults.invalid_session_backoff_ms,
            )?,
            reconnect_delay_ms: parse_or(
                lookup,
                "GATEWAY_RECONNECT_DELAY_MS",
                defaults.reconnect_delay_ms,
            )?,
            max_reconnect_attempts: parse_or(
                lookup,
                "GATEWAY_MAX_RECONNECT_ATTEMPTS",
                defaults.max_reconnect_attempts,
            )?,
            event_concurrency: parse_or(
                lookup,
                "GATEWAY_EVENT_CONCURRENCY",
                defaults.event_concurrency,
            )?,
            outbound_buffer: parse_or(lookup, "GATEWAY_OUTBOUND_BUFFER", defaults.outbound_buffer)?,
            zombie_detection: parse_or(
                lookup,
                "GATEWAY_ZOMBIE_DETECTION",
                defaults.zombie_detection,
            )?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
