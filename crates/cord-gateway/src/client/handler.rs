//! Bot hooks

use super::Context;
use crate::events::Message;
use async_trait::async_trait;

/// Hooks a bot overrides to react to the gateway.
///
/// Both hooks default to doing nothing. They run on the event bus, so a slow
/// hook never delays heartbeats or the receive loop; returned errors are
/// logged and dropped.
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    /// Called every time the transport (re)opens, before the handshake
    async fn on_connect(&self, _ctx: Context) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called for every MESSAGE_CREATE dispatch
    async fn on_message(&self, _ctx: Context, _message: Message) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Handler that ignores everything; useful with raw bus subscriptions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

impl EventHandler for NoopHandler {}
