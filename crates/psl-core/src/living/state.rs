use std::collections::BTreeMap;

use crate::automaton::{LenFacet, StateId};
use crate::capture::{Binding, CaptureContext};
use crate::subject::{NodeId, Subject};

/// Which check a cursor can consume next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// Not tied to a node: ready to start on any value check
    Free,
    /// Waiting for the type check of this node
    Node(NodeId),
    /// Waiting for the attribute, index or key check of this owner that
    /// follows the child it just matched
    Owner(NodeId),
    /// No further discriminant can arrive; only event edges can move it
    Detached,
}

/// Node a cursor last consumed, kept for guards and effects that run on
/// event edges after the walk has moved on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    node: NodeId,
    type_name: String,
    ancestors: Vec<NodeId>,
    attrs: usize,
    indices: usize,
    keys: usize,
}

impl Position {
    pub(crate) fn of(subject: &dyn Subject) -> Self {
        Self {
            node: subject.id(),
            type_name: subject.type_name().to_string(),
            ancestors: subject.ancestors().to_vec(),
            attrs: subject.attr_count(),
            indices: subject.indice_count(),
            keys: subject.key_count(),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn ancestors(&self) -> &[NodeId] {
        &self.ancestors
    }

    pub fn depth(&self) -> usize {
        self.ancestors.len()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.ancestors.last().copied()
    }

    pub(crate) fn count(&self, facet: LenFacet) -> usize {
        match facet {
            LenFacet::Attrs => self.attrs,
            LenFacet::Indices => self.indices,
            LenFacet::Keys => self.keys,
        }
    }
}

/// One cursor inside a register
#[derive(Debug, Clone, PartialEq)]
pub struct LivingState {
    pub(crate) state: StateId,
    pub(crate) alive: bool,
    pub(crate) have_finished: bool,
    pub(crate) anchor: Anchor,
    pub(crate) position: Option<Position>,
    pub(crate) capture: Option<CaptureContext>,
    pub(crate) bindings: BTreeMap<String, Binding>,
    /// Values of `->>` captures waiting for their index or key
    pub(crate) pair_values: BTreeMap<String, CaptureContext>,
}

impl LivingState {
    /// Fresh cursor at the initial state
    pub fn new() -> Self {
        Self {
            state: StateId::INITIAL,
            alive: false,
            have_finished: false,
            anchor: Anchor::Free,
            position: None,
            capture: None,
            bindings: BTreeMap::new(),
            pair_values: BTreeMap::new(),
        }
    }

    pub fn state(&self) -> StateId {
        self.state
    }

    /// Moved during the current step
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Completed a block and returned to the initial state
    pub fn have_finished(&self) -> bool {
        self.have_finished
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    /// Context of what the cursor matched last
    pub fn capture(&self) -> Option<&CaptureContext> {
        self.capture.as_ref()
    }

    pub fn bindings(&self) -> &BTreeMap<String, Binding> {
        &self.bindings
    }
}

impl Default for LivingState {
    fn default() -> Self {
        Self::new()
    }
}
