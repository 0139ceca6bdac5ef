// src/core/session/registry.rs
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::config::RasterizerConfig;
use crate::core::call_tree::MethodSignature;
use crate::core::render::RendererKind;
use crate::error::Result;
use super::trace_session::{SessionId, TraceSession};

/// Active sessions of one thread, in start order
#[derive(Debug, Default)]
struct ThreadSlot {
    sessions: Vec<TraceSession>,
}

/// Routes entry/exit events to the sessions active on the calling thread
///
/// Each thread owns one slot. The map of slots is only write-locked when a
/// thread's first session starts or its last session ends; events take a
/// read lock on the map and the calling thread's slot lock.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    slots: RwLock<HashMap<ThreadId, Arc<Mutex<ThreadSlot>>>>,
    next_id: AtomicU64,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry shared by every `Tracer` built without an explicit one
    pub fn global() -> Arc<SessionRegistry> {
        static GLOBAL: OnceLock<Arc<SessionRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SessionRegistry::new())).clone()
    }

    fn current_slot(&self) -> Option<Arc<Mutex<ThreadSlot>>> {
        self.slots.read().get(&thread::current().id()).cloned()
    }

    /// Record an entry in every session of this thread, oldest first
    pub fn on_enter(&self, signature: &MethodSignature) {
        if let Some(slot) = self.current_slot() {
            for session in slot.lock().sessions.iter_mut() {
                session.record_entry(signature);
            }
        }
    }

    /// Restore cursor and depth in every session of this thread that saw the matching entry
    pub fn on_exit(&self, signature: &MethodSignature) {
        if let Some(slot) = self.current_slot() {
            for session in slot.lock().sessions.iter_mut() {
                session.record_exit(signature);
            }
        }
    }

    /// Open the writer and register a new active session on this thread
    ///
    /// Fails without registering anything when the output cannot be opened.
    pub fn start_root_session(
        &self,
        root: &MethodSignature,
        max_depth: usize,
        output: &Path,
        kind: RendererKind,
        rasterizer: &RasterizerConfig,
    ) -> Result<SessionId> {
        let id = self.allocate_id();
        let session = TraceSession::create(id, root, max_depth, output, kind, rasterizer)?;
        self.register(session);
        Ok(id)
    }

    pub fn allocate_id(&self) -> SessionId {
        SessionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Activate `session` and append it to this thread's slot
    pub fn register(&self, mut session: TraceSession) -> SessionId {
        let id = session.id();
        session.activate();

        let slot = self
            .slots
            .write()
            .entry(thread::current().id())
            .or_default()
            .clone();
        slot.lock().sessions.push(session);

        debug!("Registered session {} on {:?}", id, thread::current().id());
        id
    }

    /// Remove a session from this thread's slot so it no longer sees events
    pub fn detach_session(&self, id: SessionId) -> Option<TraceSession> {
        let tid = thread::current().id();
        let slot = self.current_slot()?;

        let (session, now_empty) = {
            let mut slot = slot.lock();
            let position = slot.sessions.iter().position(|s| s.id() == id)?;
            let session = slot.sessions.remove(position);
            (session, slot.sessions.is_empty())
        };

        if now_empty {
            let mut slots = self.slots.write();
            if slots.get(&tid).is_some_and(|slot| slot.lock().sessions.is_empty()) {
                slots.remove(&tid);
            }
        }

        debug!("Detached session {} from {:?}", id, tid);
        Some(session)
    }

    /// Detach and render a session, returning the diagram path
    ///
    /// `Ok(None)` when the session is not active on this thread.
    pub fn finish_session(&self, id: SessionId) -> Result<Option<PathBuf>> {
        match self.detach_session(id) {
            Some(session) => {
                let output = session.finish()?;
                debug!("Finished session {} ({:?})", id, output);
                Ok(output)
            }
            None => Ok(None),
        }
    }

    /// Sessions active on the calling thread, oldest first
    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.current_slot()
            .map(|slot| slot.lock().sessions.iter().map(TraceSession::id).collect())
            .unwrap_or_default()
    }

    /// Current depth of an active session on the calling thread
    pub fn session_depth(&self, id: SessionId) -> Option<usize> {
        let slot = self.current_slot()?;
        let slot = slot.lock();
        slot.sessions
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.tree().depth())
    }

    /// Output path of an active session on the calling thread
    pub fn session_output(&self, id: SessionId) -> Option<PathBuf> {
        let slot = self.current_slot()?;
        let slot = slot.lock();
        slot.sessions
            .iter()
            .find(|s| s.id() == id)
            .and_then(|s| s.output().map(Path::to_path_buf))
    }

    /// Number of threads that currently have at least one active session
    pub fn active_threads(&self) -> usize {
        self.slots.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(owner: &str, member: &str) -> MethodSignature {
        MethodSignature::method(owner, member)
    }

    fn start(registry: &SessionRegistry, dir: &Path, root: &MethodSignature, depth: usize) -> SessionId {
        let path = dir.join(format!("{}.txt", root.short_string()));
        registry
            .start_root_session(root, depth, &path, RendererKind::Text, &RasterizerConfig::default())
            .unwrap()
    }

    #[test]
    fn test_events_without_sessions_are_ignored() {
        let registry = SessionRegistry::new();
        registry.on_enter(&sig("p.A", "a"));
        registry.on_exit(&sig("p.A", "a"));
        assert!(registry.active_sessions().is_empty());
        assert_eq!(registry.active_threads(), 0);
    }

    #[test]
    fn test_sessions_have_independent_budgets() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();

        let outer_root = sig("p.Outer", "run");
        let outer = start(&registry, dir.path(), &outer_root, 1);
        let inner_root = sig("p.Inner", "run");
        registry.on_enter(&inner_root);
        let inner = start(&registry, dir.path(), &inner_root, 3);

        assert_eq!(registry.active_sessions(), vec![outer, inner]);

        registry.on_enter(&sig("p.Leaf", "leaf"));
        assert_eq!(registry.session_depth(outer), Some(1));
        assert_eq!(registry.session_depth(inner), Some(1));
        registry.on_exit(&sig("p.Leaf", "leaf"));

        registry.finish_session(inner).unwrap();
        registry.on_exit(&inner_root);
        assert_eq!(registry.session_depth(outer), Some(0));
        registry.finish_session(outer).unwrap();

        assert_eq!(registry.active_threads(), 0);
        let outer_text = std::fs::read_to_string(dir.path().join("Outer.run().txt")).unwrap();
        assert_eq!(outer_text, "Outer.run() -> void{\nInner.run() -> void;\n}\n");
        let inner_text = std::fs::read_to_string(dir.path().join("Inner.run().txt")).unwrap();
        assert_eq!(inner_text, "Inner.run() -> void{\nLeaf.leaf() -> void;\n}\n");
    }

    #[test]
    fn test_detach_unknown_session() {
        let registry = SessionRegistry::new();
        assert!(registry.detach_session(SessionId(42)).is_none());
        assert!(registry.finish_session(SessionId(42)).unwrap().is_none());
    }

    #[test]
    fn test_other_threads_do_not_see_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let registry = SessionRegistry::new();
        let root = sig("p.Main", "main");
        let id = start(&registry, dir.path(), &root, 5);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                assert!(registry.active_sessions().is_empty());
                registry.on_enter(&sig("p.Worker", "work"));
                registry.on_exit(&sig("p.Worker", "work"));
            });
        });

        assert_eq!(registry.session_depth(id), Some(0));
        registry.finish_session(id).unwrap();
        let text = std::fs::read_to_string(dir.path().join("Main.main().txt")).unwrap();
        assert_eq!(text, "Main.main() -> void;\n");
    }
}
