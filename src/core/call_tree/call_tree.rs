// src/core/call_tree/call_tree.rs
use serde::Serialize;

use super::call_node::{CallNode, NodeId};
use super::signature::MethodSignature;

/// Outcome of offering an entry event to a tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A node was appended under the cursor and became the new cursor
    Recorded(NodeId),
    /// The depth guard refused the entry; its exit will be absorbed
    Suppressed,
}

/// Call tree built incrementally from entry/exit events
///
/// All nodes live in one arena owned by the tree. `depth` is the number of
/// ancestors of `cursor`, so it is zero exactly when the cursor is the root.
#[derive(Debug, Clone, Serialize)]
pub struct CallTree {
    nodes: Vec<CallNode>,
    cursor: NodeId,
    depth: usize,
    /// Entries refused by the depth guard that have not exited yet
    suppressed: usize,
}

impl CallTree {
    const ROOT: NodeId = NodeId(0);

    pub fn new(root: &MethodSignature) -> Self {
        Self {
            nodes: vec![CallNode::from_signature(Self::ROOT, root, None)],
            cursor: Self::ROOT,
            depth: 0,
            suppressed: 0,
        }
    }

    pub fn root(&self) -> &CallNode {
        &self.nodes[Self::ROOT.0]
    }

    pub fn cursor(&self) -> &CallNode {
        &self.nodes[self.cursor.0]
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    /// Number of recorded nodes, root included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &CallNode {
        &self.nodes[id.0]
    }

    pub fn parent_of(&self, node: &CallNode) -> Option<&CallNode> {
        node.parent().map(|id| self.node(id))
    }

    pub fn children_of<'a>(&'a self, node: &'a CallNode) -> impl Iterator<Item = &'a CallNode> + 'a {
        node.children().iter().map(move |id| self.node(*id))
    }

    /// Record an entry below the cursor unless that would descend past `max_depth`
    pub fn enter(&mut self, signature: &MethodSignature, max_depth: usize) -> EntryOutcome {
        if self.suppressed > 0 || self.depth >= max_depth {
            self.suppressed += 1;
            return EntryOutcome::Suppressed;
        }

        let id = NodeId(self.nodes.len());
        self.nodes
            .push(CallNode::from_signature(id, signature, Some(self.cursor)));
        self.nodes[self.cursor.0].push_child(id);
        self.cursor = id;
        self.depth += 1;
        EntryOutcome::Recorded(id)
    }

    /// Undo the most recent unmatched `enter`
    ///
    /// Returns the node that was left, or `None` when the exit matched a
    /// suppressed entry or arrived with the cursor already on the root.
    pub fn exit(&mut self) -> Option<NodeId> {
        if self.suppressed > 0 {
            self.suppressed -= 1;
            return None;
        }

        let left = self.cursor;
        let parent = self.nodes[left.0].parent()?;
        self.cursor = parent;
        self.depth -= 1;
        Some(left)
    }

    /// Nodes in depth-first pre-order
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            tree: self,
            stack: vec![Self::ROOT],
        }
    }
}

pub struct PreOrder<'a> {
    tree: &'a CallTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a CallNode;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = self.tree.node(id);
        self.stack.extend(node.children().iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(owner: &str, member: &str) -> MethodSignature {
        MethodSignature::method(owner, member)
    }

    #[test]
    fn test_chain_within_depth() {
        let mut tree = CallTree::new(&sig("p.A", "a"));
        tree.enter(&sig("p.B", "b"), 2);
        tree.enter(&sig("p.C", "c"), 2);
        assert_eq!(tree.depth(), 2);
        tree.exit();
        tree.exit();

        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.cursor().id(), tree.root().id());

        let root = tree.root();
        assert_eq!(root.children().len(), 1);
        let b = tree.node(root.children()[0]);
        assert_eq!(b.member_name(), "b");
        assert_eq!(b.children().len(), 1);
        let c = tree.node(b.children()[0]);
        assert_eq!(c.member_name(), "c");
        assert!(!c.has_children());
        assert_eq!(tree.parent_of(c).map(|n| n.id()), Some(b.id()));
    }

    #[test]
    fn test_depth_zero_records_only_root() {
        let mut tree = CallTree::new(&sig("p.A", "a"));
        assert_eq!(tree.enter(&sig("p.B", "b"), 0), EntryOutcome::Suppressed);
        assert_eq!(tree.enter(&sig("p.C", "c"), 0), EntryOutcome::Suppressed);
        assert_eq!(tree.exit(), None);
        assert_eq!(tree.exit(), None);

        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.suppressed(), 0);
    }

    #[test]
    fn test_depth_one_drops_grandchildren() {
        let mut tree = CallTree::new(&sig("p.A", "a"));
        tree.enter(&sig("p.B", "b"), 1);
        assert_eq!(tree.enter(&sig("p.C", "c"), 1), EntryOutcome::Suppressed);
        tree.exit();
        tree.exit();
        tree.enter(&sig("p.D", "d"), 1);
        tree.exit();

        let names: Vec<_> = tree.iter().map(|n| n.member_name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "d"]);
        assert_eq!(tree.depth(), 0);
    }

    // Root at index 0, depth equal to the cursor's ancestor count, every
    // parent and child link in range and mutually consistent.
    fn assert_well_formed(tree: &CallTree) {
        assert!(tree.root().is_root());
        assert_eq!(tree.root().id().index(), 0);

        let mut ancestors = 0;
        let mut current = tree.cursor();
        while let Some(parent) = tree.parent_of(current) {
            ancestors += 1;
            current = parent;
        }
        assert_eq!(ancestors, tree.depth());
        assert_eq!(current.id(), tree.root().id());

        let visited: Vec<_> = tree.iter().collect();
        assert_eq!(visited.len(), tree.node_count());
        for node in visited {
            for child in tree.children_of(node) {
                assert_eq!(child.parent(), Some(node.id()));
            }
        }
    }

    #[test]
    fn test_event_sequences_keep_tree_well_formed() {
        let mut tree = CallTree::new(&sig("p.A", "a"));
        assert_well_formed(&tree);

        let events = [
            Some("b"), Some("c"), None, Some("d"), Some("e"), Some("f"), None, None,
            None, None, None, Some("g"), Some("h"), None,
        ];
        for event in events {
            match event {
                Some(member) => {
                    tree.enter(&sig("p.X", member), 3);
                }
                None => {
                    tree.exit();
                }
            }
            assert_well_formed(&tree);
        }

        let names: Vec<_> = tree.iter().map(|n| n.member_name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e", "g", "h"]);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_exit_on_root_is_ignored() {
        let mut tree = CallTree::new(&sig("p.A", "a"));
        assert_eq!(tree.exit(), None);
        assert_eq!(tree.depth(), 0);
    }

    #[test]
    fn test_children_keep_call_order() {
        let mut tree = CallTree::new(&sig("p.A", "a"));
        for member in ["first", "second", "third"] {
            tree.enter(&sig("p.B", member), 3);
            tree.exit();
        }

        let root = tree.root();
        let names: Vec<_> = tree.children_of(root).map(|n| n.member_name()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }
}
