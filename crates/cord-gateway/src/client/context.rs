//! Hook context

use crate::connection::{SessionHandle, SessionState};
use crate::events::User;

/// What a hook can see of the running session
#[derive(Debug, Clone)]
pub struct Context {
    session: SessionHandle,
}

impl Context {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Self { session }
    }

    /// The authenticated user, once READY has arrived
    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    #[must_use]
    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    /// Ask the session to shut down
    pub fn close(&self) {
        self.session.close();
    }
}
