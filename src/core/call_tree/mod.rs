// src/core/call_tree/mod.rs
//! Call tree capture
//!
//! A `CallTree` is grown one entry/exit event at a time. Nodes are stored in
//! an arena owned by the tree; children are forward edges and the parent link
//! is a plain index used to move the cursor back up.

mod call_node;
mod call_tree;
mod signature;

pub use call_node::{CallNode, NodeId};
pub use call_tree::{CallTree, EntryOutcome, PreOrder};
pub use signature::{
    raw_simple_name, simple_name, MethodSignature, CONSTRUCTOR_MARKER, UNKNOWN_PARAM_TYPE, UNKNOWN_TYPE,
};
