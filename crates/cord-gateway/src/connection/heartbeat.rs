//! Heartbeat monitor
//!
//! A dedicated task sends a heartbeat frame every interval through the
//! connection's outbound queue. It reads the sequence from the shared
//! session at send time, so each beat carries the latest value.

use super::session::SessionHandle;
use crate::protocol::Envelope;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest interval the timer runs at; `tokio::time::interval` rejects zero
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Why the heartbeat task stopped on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatExit {
    /// The previous beat was never acknowledged
    Zombied,
    /// The outbound queue is gone; the connection is tearing down
    ChannelClosed,
    /// The task was aborted or panicked
    Cancelled,
}

impl fmt::Display for HeartbeatExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zombied => f.write_str("heartbeat not acknowledged"),
            Self::ChannelClosed => f.write_str("outbound channel closed"),
            Self::Cancelled => f.write_str("heartbeat cancelled"),
        }
    }
}

/// Handle to a running heartbeat task.
///
/// Dropping the handle aborts the task.
pub struct HeartbeatMonitor {
    handle: JoinHandle<HeartbeatExit>,
    interval: Duration,
}

impl HeartbeatMonitor {
    /// Spawn the heartbeat task.
    ///
    /// The first beat goes out immediately, then one per `interval`. With
    /// `zombie_detection` on, the task stops when a tick finds the previous
    /// beat still unacknowledged.
    #[must_use]
    pub fn start(
        interval: Duration,
        session: SessionHandle,
        outbound: mpsc::Sender<Envelope>,
        zombie_detection: bool,
    ) -> Self {
        let interval = interval.max(MIN_INTERVAL);
        session.ack_heartbeat();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::debug!(interval_ms = interval.as_millis(), "Heartbeat task started");

            loop {
                ticker.tick().await;

                if !session.begin_heartbeat() && zombie_detection {
                    tracing::warn!("Connection zombied (heartbeat not ACKed)");
                    return HeartbeatExit::Zombied;
                }

                let seq = session.last_sequence();
                tracing::trace!(seq = ?seq, "Sending heartbeat");
                if outbound.send(Envelope::heartbeat(seq)).await.is_err() {
                    tracing::debug!("Heartbeat channel closed, stopping heartbeat task");
                    return HeartbeatExit::ChannelClosed;
                }
            }
        });

        Self { handle, interval }
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop the task immediately
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// Wait for the task to stop on its own.
    ///
    /// Must not be polled again once it has resolved.
    pub async fn stopped(&mut self) -> HeartbeatExit {
        (&mut self.handle).await.unwrap_or(HeartbeatExit::Cancelled)
    }
}

impl Drop for HeartbeatMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl fmt::Debug for HeartbeatMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeartbeatMonitor")
            .field("interval", &self.interval)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
