// src/core/session/guard.rs
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{error, info};

use crate::core::call_tree::MethodSignature;
use super::registry::SessionRegistry;
use super::trace_session::{SessionId, TraceSession};

/// Delivers the exit event for one ordinary call when dropped
///
/// Dropping happens on normal return and while unwinding alike, so the
/// cursor and depth of every session end up in the same state either way.
#[must_use = "the call is exited as soon as the guard is dropped"]
pub struct CallGuard {
    registry: Arc<SessionRegistry>,
    signature: MethodSignature,
    // Events must be delivered on the thread that entered the call.
    _thread_bound: PhantomData<*const ()>,
}

impl CallGuard {
    pub(crate) fn enter(registry: Arc<SessionRegistry>, signature: MethodSignature) -> Self {
        registry.on_enter(&signature);
        Self {
            registry,
            signature,
            _thread_bound: PhantomData,
        }
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.registry.on_exit(&self.signature);
    }
}

/// Exit side of a root-eligible call: finishes its own session, if one was
/// started, and exits the call in every enclosing session
#[must_use = "the root call is finished as soon as the guard is dropped"]
pub struct RootGuard {
    registry: Arc<SessionRegistry>,
    signature: MethodSignature,
    session: Option<SessionId>,
    _thread_bound: PhantomData<*const ()>,
}

impl RootGuard {
    pub(crate) fn new(
        registry: Arc<SessionRegistry>,
        signature: MethodSignature,
        session: Option<SessionId>,
    ) -> Self {
        Self {
            registry,
            signature,
            session,
            _thread_bound: PhantomData,
        }
    }

    /// `None` when the session could not be started
    pub fn session_id(&self) -> Option<SessionId> {
        self.session
    }

    pub fn signature(&self) -> &MethodSignature {
        &self.signature
    }
}

impl Drop for RootGuard {
    fn drop(&mut self) {
        let session = self
            .session
            .and_then(|id| self.registry.detach_session(id));
        self.registry.on_exit(&self.signature);

        if let Some(session) = session {
            finish_quietly(session);
            info!("DIAGRAM END {}", self.signature.short_string());
        }
    }
}

// Tracing failures are reported here and never reach the traced code.
fn finish_quietly(session: TraceSession) {
    let id = session.id();
    match panic::catch_unwind(AssertUnwindSafe(move || session.finish())) {
        Ok(Ok(Some(path))) => info!("Session {} diagram written to {}", id, path.display()),
        Ok(Ok(None)) => info!("Session {} rendered", id),
        Ok(Err(e)) => error!("Session {} failed to render: {}", id, e),
        Err(_) => error!("Session {} panicked while rendering", id),
    }
}
