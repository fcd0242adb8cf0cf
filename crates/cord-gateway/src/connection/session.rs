//! Session state
//!
//! State shared between the receive loop, the heartbeat task and anyone
//! holding a [`SessionHandle`] (hooks, the client façade).

use crate::events::User;
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// Opening the transport
    Connecting,
    /// Transport open, waiting for Hello
    AwaitingHello,
    /// Identify sent, waiting for READY
    Identifying,
    /// READY or RESUMED received
    Active,
    /// Resume sent, waiting for RESUMED
    Resuming,
    /// Session over; no more frames are sent
    Closed,
}

impl SessionState {
    /// Get the name of this state
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting",
            Self::AwaitingHello => "AwaitingHello",
            Self::Identifying => "Identifying",
            Self::Active => "Active",
            Self::Resuming => "Resuming",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct SessionShared {
    /// Current lifecycle state
    state: RwLock<SessionState>,

    /// Session ID from READY
    session_id: RwLock<Option<String>>,

    /// User from READY
    user: RwLock<Option<User>>,

    /// Gateway URL to resume against, from READY
    resume_url: RwLock<Option<String>>,

    /// Highest sequence number seen; 0 until the first one
    last_sequence: AtomicU64,

    /// Whether the last heartbeat has been acknowledged
    heartbeat_acked: AtomicBool,

    /// Set by `close()`
    close_requested: watch::Sender<bool>,

    /// Guards against two concurrent `connect` calls
    running: AtomicBool,
}

/// Cheap, cloneable handle to one session's state
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<SessionShared>,
}

impl SessionHandle {
    /// Create an empty session in the `Connecting` state
    #[must_use]
    pub fn new() -> Self {
        let (close_requested, _) = watch::channel(false);
        Self {
            inner: Arc::new(SessionShared {
                state: RwLock::new(SessionState::Connecting),
                session_id: RwLock::new(None),
                user: RwLock::new(None),
                resume_url: RwLock::new(None),
                last_sequence: AtomicU64::new(0),
                heartbeat_acked: AtomicBool::new(true),
                close_requested,
                running: AtomicBool::new(false),
            }),
        }
    }

    // === Lifecycle ===

    /// Get the current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        let previous = std::mem::replace(&mut *self.inner.state.write(), state);
        if previous != state {
            tracing::debug!(from = %previous, to = %state, "Session state changed");
        }
    }

    /// Ask the session to stop.
    ///
    /// Safe to call from any task, including event listeners. The receive loop
    /// wakes up and tears the connection down.
    pub fn close(&self) {
        self.inner.close_requested.send_replace(true);
    }

    /// Whether `close()` was called or the session ended
    pub fn is_closed(&self) -> bool {
        *self.inner.close_requested.borrow() || self.state() == SessionState::Closed
    }

    pub(crate) fn is_close_requested(&self) -> bool {
        *self.inner.close_requested.borrow()
    }

    /// Resolves once `close()` has been called
    pub(crate) async fn close_requested(&self) {
        let mut rx = self.inner.close_requested.subscribe();
        // The sender lives as long as `self`, so this cannot fail
        let _ = rx.wait_for(|requested| *requested).await;
    }

    /// Clear everything for a brand-new session
    pub(crate) fn reset(&self) {
        *self.inner.state.write() = SessionState::Connecting;
        *self.inner.session_id.write() = None;
        *self.inner.user.write() = None;
        *self.inner.resume_url.write() = None;
        self.inner.last_sequence.store(0, Ordering::SeqCst);
        self.inner.heartbeat_acked.store(true, Ordering::SeqCst);
        self.inner.close_requested.send_replace(false);
    }

    /// Claim the session for one `connect` call; false if already claimed
    pub(crate) fn try_start(&self) -> bool {
        !self.inner.running.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn finish(&self) {
        self.set_state(SessionState::Closed);
        self.inner.running.store(false, Ordering::SeqCst);
    }

    // === Identity ===

    /// Session ID assigned by READY
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.read().clone()
    }

    /// The authenticated user from READY
    pub fn current_user(&self) -> Option<User> {
        self.inner.user.read().clone()
    }

    /// Gateway URL the server asked us to resume against
    pub fn resume_url(&self) -> Option<String> {
        self.inner.resume_url.read().clone()
    }

    pub(crate) fn set_ready(&self, session_id: String, user: User, resume_url: Option<String>) {
        *self.inner.session_id.write() = Some(session_id);
        *self.inner.user.write() = Some(user);
        *self.inner.resume_url.write() = resume_url;
    }

    /// Forget the session so the next handshake identifies from scratch
    pub(crate) fn clear_session_id(&self) {
        *self.inner.session_id.write() = None;
        *self.inner.resume_url.write() = None;
    }

    // === Sequence ===

    /// Highest sequence number seen, if any
    pub fn last_sequence(&self) -> Option<u64> {
        // Stored as seq + 1 so that 0 means none seen and s = 0 is kept
        self.inner
            .last_sequence
            .load(Ordering::SeqCst)
            .checked_sub(1)
    }

    /// Record a sequence number; the stored value never goes backwards
    pub(crate) fn observe_sequence(&self, seq: u64) {
        self.inner
            .last_sequence
            .fetch_max(seq.saturating_add(1), Ordering::SeqCst);
    }

    // === Heartbeat ===

    /// Check if the last heartbeat was acknowledged
    pub fn is_heartbeat_acked(&self) -> bool {
        self.inner.heartbeat_acked.load(Ordering::SeqCst)
    }

    /// Mark a heartbeat as in flight, returning whether the previous one was acked
    pub(crate) fn begin_heartbeat(&self) -> bool {
        self.inner.heartbeat_acked.swap(false, Ordering::SeqCst)
    }

    /// Mark heartbeat as acknowledged
    pub(crate) fn ack_heartbeat(&self) {
        self.inner.heartbeat_acked.store(true, Ordering::SeqCst);
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("last_sequence", &self.last_sequence())
            .finish()
    }
}
