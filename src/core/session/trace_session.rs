// src/core/session/trace_session.rs
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RasterizerConfig;
use crate::core::call_tree::{CallTree, EntryOutcome, MethodSignature};
use crate::core::render::{create_writer, DiagramWriter, RendererKind};
use crate::error::Result;

/// Process-unique identifier of a trace session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Writer opened, not yet receiving events
    Created,
    /// Registered on its thread and recording
    Active,
    /// Rendered and closed; never reused
    Finished,
}

/// One capture-and-render lifecycle for a single root call
pub struct TraceSession {
    id: SessionId,
    tree: CallTree,
    max_depth: usize,
    writer: Box<dyn DiagramWriter>,
    output: Option<PathBuf>,
    state: SessionState,
}

impl TraceSession {
    /// Open the output for `kind` and build a session rooted at `root`
    pub fn create(
        id: SessionId,
        root: &MethodSignature,
        max_depth: usize,
        output: &Path,
        kind: RendererKind,
        rasterizer: &RasterizerConfig,
    ) -> Result<Self> {
        let writer = create_writer(kind, output, rasterizer)?;
        Ok(Self::with_writer(id, root, max_depth, writer))
    }

    pub fn with_writer(
        id: SessionId,
        root: &MethodSignature,
        max_depth: usize,
        writer: Box<dyn DiagramWriter>,
    ) -> Self {
        let output = writer.output_path().map(Path::to_path_buf);
        Self {
            id,
            tree: CallTree::new(root),
            max_depth,
            writer,
            output,
            state: SessionState::Created,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn tree(&self) -> &CallTree {
        &self.tree
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    pub(crate) fn activate(&mut self) {
        debug_assert_eq!(self.state, SessionState::Created);
        self.state = SessionState::Active;
    }

    pub fn record_entry(&mut self, signature: &MethodSignature) -> EntryOutcome {
        self.tree.enter(signature, self.max_depth)
    }

    pub fn record_exit(&mut self, signature: &MethodSignature) {
        let suppressed = self.tree.suppressed() > 0;
        if !suppressed && !self.tree.cursor().matches(signature) {
            debug!(
                "Session {} exit for {} while the cursor is on {}.{}",
                self.id,
                signature.short_string(),
                self.tree.cursor().simple_type_name(),
                self.tree.cursor().member_name()
            );
        }
        self.tree.exit();
    }

    /// Render the tree and release the output
    ///
    /// The output is closed even when rendering fails part way.
    pub fn finish(mut self) -> Result<Option<PathBuf>> {
        self.state = SessionState::Finished;

        let rendered = self.writer.render(&self.tree);
        let closed = self.writer.close();
        rendered?;
        closed?;
        Ok(self.output)
    }
}

impl fmt::Debug for TraceSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("max_depth", &self.max_depth)
            .field("nodes", &self.tree.node_count())
            .field("depth", &self.tree.depth())
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TraceError;

    #[test]
    fn test_finish_writes_and_closes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.a().txt");
        let mut session = TraceSession::create(
            SessionId(1),
            &MethodSignature::method("p.A", "a"),
            1,
            &path,
            RendererKind::Text,
            &RasterizerConfig::default(),
        )
        .unwrap();
        session.activate();

        session.record_entry(&MethodSignature::method("p.B", "b"));
        session.record_entry(&MethodSignature::method("p.C", "c"));
        session.record_exit(&MethodSignature::method("p.C", "c"));
        session.record_exit(&MethodSignature::method("p.B", "b"));
        assert_eq!(session.tree().depth(), 0);
        assert_eq!(session.state(), SessionState::Active);

        let written = session.finish().unwrap();
        assert_eq!(written.as_deref(), Some(path.as_path()));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "A.a() -> void{\nB.b() -> void;\n}\n"
        );
    }

    #[test]
    fn test_unreachable_output_fails_creation() {
        let result = TraceSession::create(
            SessionId(2),
            &MethodSignature::method("p.A", "a"),
            1,
            Path::new("/nonexistent-calltrace-dir/A.a().txt"),
            RendererKind::Structured,
            &RasterizerConfig::default(),
        );
        assert!(matches!(result, Err(TraceError::OutputTarget { .. })));
    }
}
