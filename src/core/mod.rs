// src/core/mod.rs
mod call_tree;
mod render;
mod replay;
mod session;
mod tracer;

pub use call_tree::{
    raw_simple_name, simple_name, CallNode, CallTree, EntryOutcome, MethodSignature, NodeId, PreOrder,
    CONSTRUCTOR_MARKER, UNKNOWN_PARAM_TYPE, UNKNOWN_TYPE,
};
pub use render::{
    create_writer, ActorWriter, DiagramOutput, DiagramWriter, ImageWriter, Rasterizer,
    RasterizerCommand, RendererKind, SequenceWriter, INPUT_PLACEHOLDER,
};
pub use replay::{
    collect_scripts, replay, replay_all, ReplaySummary, Script, ScriptEvent, ScriptLine,
    SCRIPT_EXTENSION,
};
pub use session::{CallGuard, RootGuard, SessionId, SessionRegistry, SessionState, TraceSession};
pub use tracer::{validate_depth, TraceRequest, Tracer};
