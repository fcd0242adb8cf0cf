//! Example bot entry point
//!
//! Run with:
//! ```bash
//! BOT_TOKEN=... cargo run -p cord-bot
//! ```
//!
//! Configuration is loaded from environment variables or a `.env` file.

mod bot;

use cord_common::{try_init_tracing_with_config, AppConfig, TracingConfig};
use cord_gateway::GatewayClient;
use cord_rest::RestClient;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!(error = %e, "Bot stopped with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Failed to load configuration: {e}");
        e
    })?;

    // Initialize tracing
    if let Err(e) = try_init_tracing_with_config(TracingConfig::for_environment(config.app.env)) {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    info!(
        name = %config.app.name,
        env = ?config.app.env,
        gateway = %config.gateway.url,
        "Configuration loaded"
    );

    let rest = RestClient::bot(&config.rest, config.bot.token.clone());
    let channel_id = bot::find_channel(&rest, &config.bot.channel_name).await?;
    info!(channel = %config.bot.channel_name, channel_id = ?channel_id, "Announce channel resolved");

    let client = GatewayClient::new(config.gateway.clone(), bot::PingBot::new(rest, channel_id));

    // Ctrl-C closes the session cleanly
    let session = client.session();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            session.close();
        }
    });

    client.connect(&config.bot.token).await?;
    info!("Bot exited");

    Ok(())
}
