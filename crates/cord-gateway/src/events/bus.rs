//! Event bus
//!
//! Maps event names to listeners and fans payloads out to them without
//! blocking the caller on listener completion.

use dashmap::DashMap;
use futures_util::future::BoxFuture;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

type Callback = dyn Fn(Value) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync;

/// Identity of a listener; shared by all clones of it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// A subscriber handle: an async callback with a stable identity.
///
/// Registering the same listener (or a clone of it) twice under one event is a no-op.
#[derive(Clone)]
pub struct Listener {
    id: ListenerId,
    callback: Arc<Callback>,
}

impl Listener {
    /// Wrap an async callback
    pub fn new<F, Fut>(callback: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            id: ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed)),
            callback: Arc::new(move |payload| -> BoxFuture<'static, anyhow::Result<()>> {
                Box::pin(callback(payload))
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ListenerId {
        self.id
    }

    fn call(&self, payload: Value) -> BoxFuture<'static, anyhow::Result<()>> {
        (self.callback)(payload)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Listener {}

impl Hash for Listener {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener").field("id", &self.id).finish()
    }
}

/// Registry of listeners keyed by event name.
///
/// Every listener call runs in its own task. At most `max_in_flight` calls run
/// at once; `emit` waits for a free slot before spawning, never for completion.
pub struct EventBus {
    listeners: DashMap<String, HashSet<Listener>>,
    permits: Arc<Semaphore>,
    max_in_flight: usize,
}

impl EventBus {
    /// Default cap on concurrently running listener calls
    pub const DEFAULT_MAX_IN_FLIGHT: usize = 64;

    /// Create a bus allowing `max_in_flight` concurrent listener calls (at least one)
    #[must_use]
    pub fn new(max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        Self {
            listeners: DashMap::new(),
            permits: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
        }
    }

    /// Create a new bus wrapped in Arc
    #[must_use]
    pub fn new_shared(max_in_flight: usize) -> Arc<Self> {
        Arc::new(Self::new(max_in_flight))
    }

    /// Register `listener` under `event`.
    ///
    /// Returns `false` when it was already registered (nothing changes).
    pub fn subscribe(&self, event: impl Into<String>, listener: Listener) -> bool {
        let event = event.into();
        let id = listener.id();
        let added = self.listeners.entry(event.clone()).or_default().insert(listener);

        if added {
            tracing::trace!(event = %event, listener = %id, "Listener subscribed");
        }
        added
    }

    /// Remove `listener` from `event`.
    ///
    /// Returns whether a registration existed and was removed.
    pub fn unsubscribe(&self, event: &str, listener: &Listener) -> bool {
        let removed = self
            .listeners
            .get_mut(event)
            .is_some_and(|mut set| set.remove(listener));

        if removed {
            self.listeners.remove_if(event, |_, set| set.is_empty());
            tracing::trace!(event = %event, listener = %listener.id(), "Listener unsubscribed");
        }
        removed
    }

    /// Number of listeners registered under `event`
    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map_or(0, |set| set.len())
    }

    /// Check if anything listens to `event`
    pub fn has_listeners(&self, event: &str) -> bool {
        self.listener_count(event) > 0
    }

    /// Number of listener calls currently running
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.permits.available_permits()
    }

    /// Publish `payload` to every listener of `event`.
    ///
    /// Returns `false` without dispatching when nobody listens. Listener
    /// failures are logged and never reach the caller.
    pub async fn emit(&self, event: &str, payload: Value) -> bool {
        // Snapshot so no map guard is held across an await
        let listeners: Vec<Listener> = match self.listeners.get(event) {
            Some(set) => set.iter().cloned().collect(),
            None => return false,
        };
        if listeners.is_empty() {
            return false;
        }

        tracing::trace!(event = %event, listeners = listeners.len(), "Emitting event");

        for listener in listeners {
            let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
                return false;
            };
            let event = event.to_string();
            let payload = payload.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = listener.call(payload).await {
                    tracing::warn!(
                        event = %event,
                        listener = %listener.id(),
                        error = %e,
                        "Listener failed"
                    );
                }
            });
        }

        true
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_IN_FLIGHT)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.listeners.len())
            .field("max_in_flight", &self.max_in_flight)
            .field("in_flight", &self.in_flight())
            .finish()
    }
}
