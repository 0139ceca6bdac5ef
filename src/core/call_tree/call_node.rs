// src/core/call_tree/call_node.rs
use serde::Serialize;

use super::signature::{
    simple_name, MethodSignature, CONSTRUCTOR_MARKER, UNKNOWN_PARAM_TYPE, UNKNOWN_TYPE,
};

/// Index of a node inside its owning `CallTree`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// One observed call
///
/// Fields are fixed at construction; only `children` grows as nested calls are observed.
#[derive(Debug, Clone, Serialize)]
pub struct CallNode {
    id: NodeId,
    owning_type: String,
    member_name: String,
    is_static: bool,
    is_constructor: bool,
    return_type: Option<String>,
    parameter_types: Vec<String>,
    parameter_names: Vec<String>,
    children: Vec<NodeId>,
    /// Used only to move the cursor back up; the tree owns every node
    parent: Option<NodeId>,
}

impl CallNode {
    /// Build a node from an instrumentation descriptor, filling gaps with placeholders
    pub(crate) fn from_signature(
        id: NodeId,
        signature: &MethodSignature,
        parent: Option<NodeId>,
    ) -> Self {
        let owning_type = if signature.owning_type.trim().is_empty() {
            UNKNOWN_TYPE.to_string()
        } else {
            signature.owning_type.clone()
        };

        let member_name = if signature.is_constructor || signature.member_name.trim().is_empty() {
            CONSTRUCTOR_MARKER.to_string()
        } else {
            signature.member_name.clone()
        };

        let arity = signature
            .parameter_types
            .len()
            .max(signature.parameter_names.len());
        let parameter_types = (0..arity)
            .map(|i| {
                signature
                    .parameter_types
                    .get(i)
                    .filter(|ty| !ty.is_empty())
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_PARAM_TYPE.to_string())
            })
            .collect();
        let parameter_names = (0..arity)
            .map(|i| {
                signature
                    .parameter_names
                    .get(i)
                    .filter(|name| !name.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("arg{}", i))
            })
            .collect();

        Self {
            id,
            owning_type,
            member_name,
            is_static: signature.is_static,
            is_constructor: signature.is_constructor,
            return_type: if signature.is_constructor {
                None
            } else {
                signature.return_type.clone().filter(|ret| !ret.is_empty())
            },
            parameter_types,
            parameter_names,
            children: Vec::new(),
            parent,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn owning_type(&self) -> &str {
        &self.owning_type
    }

    pub fn simple_type_name(&self) -> &str {
        simple_name(&self.owning_type)
    }

    pub fn member_name(&self) -> &str {
        &self.member_name
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn is_constructor(&self) -> bool {
        self.is_constructor
    }

    pub fn return_type(&self) -> Option<&str> {
        self.return_type.as_deref()
    }

    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// `(type, name)` pairs in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &str)> {
        self.parameter_types
            .iter()
            .map(String::as_str)
            .zip(self.parameter_names.iter().map(String::as_str))
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Whether this node was created for the given descriptor
    pub fn matches(&self, signature: &MethodSignature) -> bool {
        let member = if signature.is_constructor || signature.member_name.is_empty() {
            CONSTRUCTOR_MARKER
        } else {
            signature.member_name.as_str()
        };
        self.owning_type == signature.owning_type && self.member_name == member
    }

    pub(crate) fn push_child(&mut self, child: NodeId) {
        self.children.push(child);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_signature_gets_placeholders() {
        let signature = MethodSignature {
            owning_type: String::new(),
            member_name: String::new(),
            parameter_types: vec!["int".to_string()],
            parameter_names: vec!["a".to_string(), "b".to_string()],
            ..MethodSignature::default()
        };

        let node = CallNode::from_signature(NodeId(0), &signature, None);
        assert_eq!(node.owning_type(), UNKNOWN_TYPE);
        assert_eq!(node.member_name(), CONSTRUCTOR_MARKER);
        assert_eq!(node.parameter_types(), ["int", UNKNOWN_PARAM_TYPE]);
        assert_eq!(node.parameter_names(), ["a", "b"]);
    }

    #[test]
    fn test_missing_parameter_names_are_numbered() {
        let signature = MethodSignature {
            owning_type: "p.Type".to_string(),
            member_name: "run".to_string(),
            parameter_types: vec!["int".to_string(), "long".to_string()],
            ..MethodSignature::default()
        };

        let node = CallNode::from_signature(NodeId(3), &signature, Some(NodeId(0)));
        let params: Vec<_> = node.parameters().collect();
        assert_eq!(params, vec![("int", "arg0"), ("long", "arg1")]);
        assert_eq!(node.parent(), Some(NodeId(0)));
        assert!(!node.is_root());
    }

    #[test]
    fn test_constructor_drops_return_type() {
        let signature = MethodSignature::constructor("p.Widget").returning("p.Widget");
        let node = CallNode::from_signature(NodeId(0), &signature, None);
        assert!(node.is_constructor());
        assert_eq!(node.return_type(), None);
        assert!(node.matches(&signature));
    }
}
