//! Post-order walker driving a living context over a [`Tree`]

use crate::errors::{PslError, Result};
use crate::living::LivingContext;
use crate::{log_op_end, log_op_error, log_op_start};

use super::tree::{Tree, TreeNode};
use super::{NodeId, Subject};

/// Outcome of a completed walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    /// Nodes reported to the living context
    pub visited: usize,
    /// Cursors left waiting once the root was done
    pub living: usize,
}

/// Walk `tree` from its root, reporting every node to `living`
///
/// Children come first: every attribute, then every index, then every key
/// child is walked and then reported with `check_attr`/`check_indice`/
/// `check_key` on its owner. The node itself is then reported with
/// `check_value`, `check_type` and `check_event_expr` before the step is
/// closed with `reset_living_state`.
///
/// # Errors
///
/// Returns `MalformedDocument` if the tree has no root, `UnknownSubjectNode`
/// for dangling children and `CyclicSubject` if a node is reached twice.
pub fn walk<U>(tree: &Tree, living: &mut LivingContext<'_, U>) -> Result<WalkSummary> {
    let walk_id = living.walk_id().clone();
    log_op_start!("walk", walk_id = %walk_id, node_count = tree.len());
    let start = std::time::Instant::now();

    let result = walk_impl(tree, living).map_err(|e| {
        log_op_error!(
            "walk",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            walk_id = %walk_id
        );
        e
    })?;

    log_op_end!(
        "walk",
        duration_ms = start.elapsed().as_millis() as u64,
        walk_id = %walk_id,
        visited = result.visited,
        living_count = result.living
    );
    Ok(result)
}

fn walk_impl<U>(tree: &Tree, living: &mut LivingContext<'_, U>) -> Result<WalkSummary> {
    let root = tree.root().ok_or_else(|| PslError::MalformedDocument {
        reason: "subject tree has no root".to_string(),
    })?;

    let mut walker = Walker {
        tree,
        living,
        path: Vec::new(),
        seen: vec![false; tree.len()],
        visited: 0,
    };
    walker.visit(root)?;

    Ok(WalkSummary {
        visited: walker.visited,
        living: walker.living.living_count(),
    })
}

/// [`Subject`] view of a tree node at its place in the walk
struct NodeView<'t> {
    id: NodeId,
    node: &'t TreeNode,
    ancestors: &'t [NodeId],
}

impl Subject for NodeView<'_> {
    fn id(&self) -> NodeId {
        self.id
    }

    fn type_name(&self) -> &str {
        self.node.type_name()
    }

    fn is_kind_of(&self, type_name: &str) -> bool {
        self.node.is_kind_of(type_name)
    }

    fn canonical_value(&self) -> Option<String> {
        self.node.value().map(|v| v.canonical())
    }

    fn attr_count(&self) -> usize {
        self.node.attr_count()
    }

    fn indice_count(&self) -> usize {
        self.node.indices().len()
    }

    fn key_count(&self) -> usize {
        self.node.key_count()
    }

    fn ancestors(&self) -> &[NodeId] {
        self.ancestors
    }
}

struct Walker<'t, 'c, 'a, U> {
    tree: &'t Tree,
    living: &'c mut LivingContext<'a, U>,
    /// Nodes from the root down to the one being visited
    path: Vec<NodeId>,
    seen: Vec<bool>,
    visited: usize,
}

impl<U> Walker<'_, '_, '_, U> {
    fn visit(&mut self, id: NodeId) -> Result<()> {
        let tree = self.tree;
        let node = tree.get(id)?;
        if std::mem::replace(&mut self.seen[id.index()], true) {
            return Err(PslError::CyclicSubject { node: id.raw() });
        }

        let depth = self.path.len();
        self.path.push(id);

        for (name, child) in node.attrs() {
            self.visit(child)?;
            let owner = NodeView {
                id,
                node,
                ancestors: &self.path[..depth],
            };
            self.living.check_attr(name, &owner);
        }
        for (index, child) in node.indices().iter().enumerate() {
            self.visit(*child)?;
            let owner = NodeView {
                id,
                node,
                ancestors: &self.path[..depth],
            };
            self.living.check_indice(index, &owner);
        }
        for (key, child) in node.keys() {
            self.visit(child)?;
            let owner = NodeView {
                id,
                node,
                ancestors: &self.path[..depth],
            };
            self.living.check_key(key, &owner);
        }

        self.path.pop();
        let view = NodeView {
            id,
            node,
            ancestors: &self.path,
        };
        self.living.check_value(&view);
        self.living.check_type(&view);
        self.living.check_event_expr();
        self.living.reset_living_state();
        self.visited += 1;
        Ok(())
    }
}
