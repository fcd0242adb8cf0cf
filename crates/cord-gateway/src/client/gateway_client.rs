//! Gateway client

use super::{Context, EventHandler};
use crate::connection::{DriverSettings, SessionDriver, SessionHandle, SessionMachine};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{EventBus, Listener, Message, ON_CONNECT, ON_MESSAGE};
use crate::protocol::{ConnectionProperties, GatewayIntents, IdentifyPayload};
use anyhow::Context as _;
use cord_common::GatewayConfig;
use std::sync::Arc;
use std::time::Duration;

/// Name reported as browser and device in the connection properties
const LIBRARY_NAME: &str = "cord";

/// A gateway session with bot hooks attached.
///
/// `on_connect` and `on_message` are bound to the bus at construction; other
/// dispatches can be consumed by subscribing to [`GatewayClient::event_bus`]
/// under their raw event name.
pub struct GatewayClient {
    config: GatewayConfig,
    bus: Arc<EventBus>,
    session: SessionHandle,
    hooks: Vec<(&'static str, Listener)>,
}

impl GatewayClient {
    /// Create a client and register `handler`'s hooks
    pub fn new(config: GatewayConfig, handler: impl EventHandler) -> Self {
        let bus = EventBus::new_shared(config.event_concurrency);
        let session = SessionHandle::new();
        let hooks = bind_hooks(&bus, &session, Arc::new(handler));

        Self {
            config,
            bus,
            session,
            hooks,
        }
    }

    /// Create a client with the default gateway settings
    pub fn with_defaults(handler: impl EventHandler) -> Self {
        Self::new(GatewayConfig::default(), handler)
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The bus every dispatch is published to
    #[must_use]
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Handle to the session state; stays valid across `connect` calls
    #[must_use]
    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    /// Context as handed to hooks
    #[must_use]
    pub fn context(&self) -> Context {
        Context::new(self.session.clone())
    }

    /// Connect with `token` and run until the session ends.
    ///
    /// Returns `Ok(())` after `close()`. Each call starts a fresh session.
    ///
    /// # Errors
    /// - `AlreadyRunning` if another `connect` on this client is in progress
    /// - any terminal [`GatewayError`] of the session
    pub async fn connect(&self, token: &str) -> GatewayResult<()> {
        if !self.session.try_start() {
            return Err(GatewayError::AlreadyRunning);
        }
        self.session.reset();

        let machine = SessionMachine::new(self.session.clone(), self.identify_payload(token))
            .with_invalid_session_backoff(Duration::from_millis(
                self.config.invalid_session_backoff_ms,
            ));
        let driver = SessionDriver::new(self.driver_settings(), machine, Arc::clone(&self.bus));

        let result = driver.run().await;
        self.session.finish();

        match &result {
            Ok(()) => tracing::info!("Gateway session closed"),
            Err(e) => tracing::error!(error = %e, "Gateway session ended with error"),
        }
        result
    }

    /// Stop the running session; `connect` returns once teardown completes
    pub fn close(&self) {
        self.session.close();
    }

    fn identify_payload(&self, token: &str) -> IdentifyPayload {
        let properties = ConnectionProperties::new(self.config.os.clone())
            .with_browser(LIBRARY_NAME)
            .with_device(LIBRARY_NAME);

        IdentifyPayload::new(
            token,
            properties,
            GatewayIntents::from_bits_retain(self.config.intents),
        )
        .with_large_threshold(self.config.large_threshold)
    }

    fn driver_settings(&self) -> DriverSettings {
        DriverSettings {
            url: self.config.url.clone(),
            reconnect_delay: Duration::from_millis(self.config.reconnect_delay_ms),
            max_reconnect_attempts: self.config.max_reconnect_attempts,
            outbound_buffer: self.config.outbound_buffer,
            zombie_detection: self.config.zombie_detection,
        }
    }
}

impl Drop for GatewayClient {
    fn drop(&mut self) {
        for (event, listener) in &self.hooks {
            self.bus.unsubscribe(event, listener);
        }
    }
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("url", &self.config.url)
            .field("session", &self.session)
            .field("bus", &self.bus)
            .finish()
    }
}

/// Register the handler's hooks under their fixed bus names
fn bind_hooks<H: EventHandler>(
    bus: &EventBus,
    session: &SessionHandle,
    handler: Arc<H>,
) -> Vec<(&'static str, Listener)> {
    let on_connect = {
        let handler = Arc::clone(&handler);
        let session = session.clone();
        Listener::new(move |_| {
            let handler = Arc::clone(&handler);
            let ctx = Context::new(session.clone());
            async move { handler.on_connect(ctx).await }
        })
    };

    let on_message = {
        let session = session.clone();
        Listener::new(move |payload| {
            let handler = Arc::clone(&handler);
            let ctx = Context::new(session.clone());
            async move {
                let message: Message =
                    serde_json::from_value(payload).context("invalid MESSAGE_CREATE payload")?;
                handler.on_message(ctx, message).await
            }
        })
    };

    let hooks = vec![(ON_CONNECT, on_connect), (ON_MESSAGE, on_message)];
    for (event, listener) in &hooks {
        bus.subscribe(*event, listener.clone());
    }
    hooks
}
