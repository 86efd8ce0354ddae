//! Subject trees as seen by the engine
//!
//! The engine never owns subject data. A walker hands it [`Subject`] views
//! of the node being visited; captures keep only [`NodeId`] handles and go
//! back through a [`SubjectTree`] to read or write the data.

pub mod tree;
pub mod walker;

use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::pattern::Scalar;

pub use tree::{Tree, TreeNode};
pub use walker::{walk, WalkSummary};

/// Stable identity of a subject node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    pub fn from_raw(raw: u32) -> Self {
        NodeId(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Node being visited, with its position in the walk
pub trait Subject {
    fn id(&self) -> NodeId;

    fn type_name(&self) -> &str;

    /// Kind-of test over the node's type chain
    fn is_kind_of(&self, type_name: &str) -> bool {
        self.type_name() == type_name
    }

    /// Canonical string of the node's scalar value, if it has one
    fn canonical_value(&self) -> Option<String>;

    fn attr_count(&self) -> usize;

    fn indice_count(&self) -> usize;

    fn key_count(&self) -> usize;

    /// Identities from the root down to the parent
    fn ancestors(&self) -> &[NodeId];

    fn depth(&self) -> usize {
        self.ancestors().len()
    }

    fn parent(&self) -> Option<NodeId> {
        self.ancestors().last().copied()
    }
}

/// Part of a node addressed by a capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facet {
    /// The node itself
    Node,
    Attr(String),
    Indice(usize),
    Key(String),
}

impl std::fmt::Display for Facet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Facet::Node => f.write_str("node"),
            Facet::Attr(name) => write!(f, ".{}", name),
            Facet::Indice(index) => write!(f, "[{}]", index),
            Facet::Key(key) => write!(f, "{{'{}'}}", key),
        }
    }
}

/// Read/write access used by captures
pub trait SubjectTree {
    /// Node reached from `owner` through `facet`
    ///
    /// # Errors
    ///
    /// Fails if `owner` is unknown or has no such child.
    fn resolve(&self, owner: NodeId, facet: &Facet) -> Result<NodeId>;

    /// Scalar value of `node`, if any
    ///
    /// # Errors
    ///
    /// Fails if `node` is unknown.
    fn fetch(&self, node: NodeId) -> Result<Option<Scalar>>;

    /// Overwrite the scalar value of `node`
    ///
    /// # Errors
    ///
    /// Fails if `node` is unknown.
    fn store(&mut self, node: NodeId, value: Scalar) -> Result<()>;
}
