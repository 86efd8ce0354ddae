//! Capture contexts: handles to matched parts of a subject tree
//!
//! A [`CaptureContext`] is built while the automaton consumes a node and
//! mirrors the part of the subject the pattern matched: a node with the
//! attribute, index and key contexts matched beneath it. Contexts hold only
//! [`NodeId`] handles. Reading or writing the underlying data always goes
//! back through a [`SubjectTree`], so the tree stays owned by its caller.

use serde::Serialize;

use crate::errors::Result;
use crate::pattern::Scalar;
use crate::subject::{Facet, NodeId, Subject, SubjectTree};

/// Matched part of a subject tree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CaptureContext {
    Node {
        node: NodeId,
        type_name: String,
        attrs: Vec<CaptureContext>,
        indices: Vec<CaptureContext>,
        keys: Vec<CaptureContext>,
    },
    Attr {
        owner: NodeId,
        name: String,
        value: Box<CaptureContext>,
    },
    Indice {
        owner: NodeId,
        index: usize,
        value: Box<CaptureContext>,
    },
    Key {
        owner: NodeId,
        key: String,
        value: Box<CaptureContext>,
    },
}

impl CaptureContext {
    /// Context for `subject` with no matched children
    pub fn node(subject: &dyn Subject) -> Self {
        Self::assemble(subject.id(), subject.type_name(), Vec::new())
    }

    /// Context for `node` grouping the child contexts matched under it
    ///
    /// Children are sorted by attribute name, index and key so the result
    /// does not depend on the order completions arrived in.
    pub(crate) fn assemble(node: NodeId, type_name: &str, children: Vec<CaptureContext>) -> Self {
        let mut attrs = Vec::new();
        let mut indices = Vec::new();
        let mut keys = Vec::new();
        for child in children {
            match child {
                CaptureContext::Attr { .. } => attrs.push(child),
                CaptureContext::Indice { .. } => indices.push(child),
                CaptureContext::Key { .. } => keys.push(child),
                CaptureContext::Node { .. } => {}
            }
        }
        attrs.sort_by(|a, b| a.facet_key().cmp(&b.facet_key()));
        indices.sort_by(|a, b| a.facet_key().cmp(&b.facet_key()));
        keys.sort_by(|a, b| a.facet_key().cmp(&b.facet_key()));

        CaptureContext::Node {
            node,
            type_name: type_name.to_string(),
            attrs,
            indices,
            keys,
        }
    }

    /// Subject node this context designates
    pub fn subject(&self) -> NodeId {
        match self {
            CaptureContext::Node { node, .. } => *node,
            CaptureContext::Attr { value, .. }
            | CaptureContext::Indice { value, .. }
            | CaptureContext::Key { value, .. } => value.subject(),
        }
    }

    /// Node holding the captured attribute, index or key
    pub fn owner(&self) -> Option<NodeId> {
        match self {
            CaptureContext::Node { .. } => None,
            CaptureContext::Attr { owner, .. }
            | CaptureContext::Indice { owner, .. }
            | CaptureContext::Key { owner, .. } => Some(*owner),
        }
    }

    /// How the captured node is reached from its owner
    pub fn facet(&self) -> Facet {
        match self {
            CaptureContext::Node { .. } => Facet::Node,
            CaptureContext::Attr { name, .. } => Facet::Attr(name.clone()),
            CaptureContext::Indice { index, .. } => Facet::Indice(*index),
            CaptureContext::Key { key, .. } => Facet::Key(key.clone()),
        }
    }

    /// Context of the node beneath an attribute, index or key
    pub fn value(&self) -> &CaptureContext {
        match self {
            CaptureContext::Node { .. } => self,
            CaptureContext::Attr { value, .. }
            | CaptureContext::Indice { value, .. }
            | CaptureContext::Key { value, .. } => value,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&CaptureContext> {
        match self.value() {
            CaptureContext::Node { attrs, .. } => attrs
                .iter()
                .find(|c| matches!(c, CaptureContext::Attr { name: n, .. } if n == name)),
            _ => None,
        }
    }

    pub fn indice(&self, index: usize) -> Option<&CaptureContext> {
        match self.value() {
            CaptureContext::Node { indices, .. } => indices
                .iter()
                .find(|c| matches!(c, CaptureContext::Indice { index: i, .. } if *i == index)),
            _ => None,
        }
    }

    pub fn key(&self, key: &str) -> Option<&CaptureContext> {
        match self.value() {
            CaptureContext::Node { keys, .. } => keys
                .iter()
                .find(|c| matches!(c, CaptureContext::Key { key: k, .. } if k == key)),
            _ => None,
        }
    }

    /// Read the scalar at the captured position
    ///
    /// The position is resolved from the owner, so a tree edited since the
    /// match reports what is there now.
    ///
    /// # Errors
    ///
    /// Fails if the owner is gone or no longer has the captured child.
    pub fn get(&self, tree: &impl SubjectTree) -> Result<Option<Scalar>> {
        let node = self.resolve(tree)?;
        tree.fetch(node)
    }

    /// Overwrite the scalar at the captured position
    ///
    /// # Errors
    ///
    /// Fails if the owner is gone or no longer has the captured child.
    pub fn set(&self, tree: &mut impl SubjectTree, value: impl Into<Scalar>) -> Result<()> {
        let node = self.resolve(&*tree)?;
        tree.store(node, value.into())
    }

    fn resolve(&self, tree: &impl SubjectTree) -> Result<NodeId> {
        match self.owner() {
            Some(owner) => tree.resolve(owner, &self.facet()),
            None => tree.resolve(self.subject(), &Facet::Node),
        }
    }

    fn facet_key(&self) -> (String, usize) {
        match self {
            CaptureContext::Node { .. } => (String::new(), 0),
            CaptureContext::Attr { name, .. } => (name.clone(), 0),
            CaptureContext::Indice { index, .. } => (String::new(), *index),
            CaptureContext::Key { key, .. } => (key.clone(), 0),
        }
    }

    /// Graphviz rendering of the context tree
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph capture {\n    node [shape=box];\n");
        let mut next = 0usize;
        self.write_dot(&mut out, &mut next);
        out.push_str("}\n");
        out
    }

    fn write_dot(&self, out: &mut String, next: &mut usize) -> usize {
        let id = *next;
        *next += 1;
        let label = match self {
            CaptureContext::Node {
                node, type_name, ..
            } => format!("{} {}", type_name, node),
            CaptureContext::Attr { name, .. } => format!(".{}", name),
            CaptureContext::Indice { index, .. } => format!("[{}]", index),
            CaptureContext::Key { key, .. } => format!("{{'{}'}}", key),
        };
        out.push_str(&format!(
            "    c{} [label=\"{}\"];\n",
            id,
            crate::automaton::dot::escape(&label)
        ));

        let children: Vec<&CaptureContext> = match self {
            CaptureContext::Node {
                attrs,
                indices,
                keys,
                ..
            } => attrs.iter().chain(indices).chain(keys).collect(),
            CaptureContext::Attr { value, .. }
            | CaptureContext::Indice { value, .. }
            | CaptureContext::Key { value, .. } => vec![value.as_ref()],
        };
        for child in children {
            let child_id = child.write_dot(out, next);
            out.push_str(&format!("    c{} -> c{};\n", id, child_id));
        }
        id
    }
}

/// Value bound to a capture name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Binding {
    /// `pattern->name`
    Node(CaptureContext),
    /// `pattern->>name`: the index or key together with the value under it
    Pair { key: Facet, value: CaptureContext },
}

impl Binding {
    /// Context of the bound value
    pub fn context(&self) -> &CaptureContext {
        match self {
            Binding::Node(ctx) => ctx,
            Binding::Pair { value, .. } => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subject::Tree;

    struct Leaf {
        id: NodeId,
    }

    impl Subject for Leaf {
        fn id(&self) -> NodeId {
            self.id
        }
        fn type_name(&self) -> &str {
            "Foo"
        }
        fn canonical_value(&self) -> Option<String> {
            None
        }
        fn attr_count(&self) -> usize {
            2
        }
        fn indice_count(&self) -> usize {
            0
        }
        fn key_count(&self) -> usize {
            0
        }
        fn ancestors(&self) -> &[NodeId] {
            &[]
        }
    }

    fn attr(owner: NodeId, name: &str, node: NodeId) -> CaptureContext {
        CaptureContext::Attr {
            owner,
            name: name.to_string(),
            value: Box::new(CaptureContext::Node {
                node,
                type_name: "int".into(),
                attrs: vec![],
                indices: vec![],
                keys: vec![],
            }),
        }
    }

    #[test]
    fn test_assemble_sorts_children() {
        let owner = NodeId::from_raw(0);
        let ctx = CaptureContext::assemble(
            owner,
            "Foo",
            vec![
                attr(owner, "y", NodeId::from_raw(2)),
                attr(owner, "x", NodeId::from_raw(1)),
            ],
        );

        match &ctx {
            CaptureContext::Node { attrs, .. } => {
                assert_eq!(attrs[0].facet(), Facet::Attr("x".into()));
                assert_eq!(attrs[1].facet(), Facet::Attr("y".into()));
            }
            other => panic!("unexpected context {:?}", other),
        }
        assert_eq!(ctx.attr("y").map(|c| c.subject()), Some(NodeId::from_raw(2)));
        assert!(ctx.attr("z").is_none());
    }

    #[test]
    fn test_node_context_has_no_children() {
        let ctx = CaptureContext::node(&Leaf {
            id: NodeId::from_raw(3),
        });
        assert_eq!(ctx.subject(), NodeId::from_raw(3));
        assert_eq!(ctx.owner(), None);
        assert_eq!(ctx.facet(), Facet::Node);
        assert!(ctx.attr("x").is_none());
    }

    #[test]
    fn test_get_and_set_through_tree() {
        let mut tree = Tree::new();
        let foo = tree.add_node("Foo");
        let one = tree.add_scalar(1);
        tree.set_attr(foo, "x", one).unwrap();

        let ctx = attr(foo, "x", one);
        assert_eq!(ctx.get(&tree).unwrap(), Some(Scalar::Int(1)));

        ctx.set(&mut tree, 42).unwrap();
        assert_eq!(ctx.get(&tree).unwrap(), Some(Scalar::Int(42)));
    }

    #[test]
    fn test_get_fails_when_child_removed() {
        let mut tree = Tree::new();
        let foo = tree.add_node("Foo");
        let ctx = attr(foo, "x", NodeId::from_raw(5));
        assert!(ctx.get(&tree).is_err());
        assert!(ctx.set(&mut tree, 1).is_err());
    }

    #[test]
    fn test_to_dot_lists_children() {
        let owner = NodeId::from_raw(0);
        let ctx = CaptureContext::assemble(owner, "Foo", vec![attr(owner, "x", NodeId::from_raw(1))]);
        let dot = ctx.to_dot();
        assert!(dot.starts_with("digraph capture {"));
        assert!(dot.contains("label=\".x\""));
        assert!(dot.contains("c0 -> c1;"));
        assert!(dot.contains("c1 -> c2;"));
    }
}
