// src/core/session/mod.rs
//! Trace sessions and the per-thread registry that feeds them

mod guard;
mod registry;
mod trace_session;

pub use guard::{CallGuard, RootGuard};
pub use registry::SessionRegistry;
pub use trace_session::{SessionId, SessionState, TraceSession};
