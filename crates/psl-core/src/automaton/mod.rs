//! Automaton: states, transitions and the register owning them
//!
//! States live in an arena owned by a [`StateRegister`] and refer to each
//! other through [`StateId`]/[`EdgeId`] handles. Transition tables are keyed
//! per discriminant kind, each with one wildcard slot. An edge carries the
//! guards that must hold for it to fire, the effects applied when it does
//! and a composite target that may raise a named event or invoke a hook on
//! the way to the next state.

mod builder;
pub mod dot;
pub mod register;

use std::collections::BTreeMap;

use crate::compiler::{DepthReg, EventId};
use crate::pattern::EventExpr;

pub use register::StateRegister;

/// Handle to a state inside one register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateId(u32);

impl StateId {
    /// Every register has exactly one initial state, always slot 0
    pub const INITIAL: StateId = StateId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn from_raw(raw: u32) -> Self {
        StateId(raw)
    }
}

impl std::fmt::Display for StateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Handle to an edge inside one register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EdgeId(u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a transition consumes
#[derive(Debug, Clone, PartialEq)]
pub enum Discriminator {
    Value(Option<String>),
    Type(Option<String>),
    SubType(String),
    Attr(Option<String>),
    Indice(Option<usize>),
    Key(Option<String>),
    /// Precondition: taken on `check_event_expr` when the expression holds
    Event(EventExpr),
}

impl std::fmt::Display for Discriminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Discriminator::Value(v) => write!(f, "={}", v.as_deref().unwrap_or("*")),
            Discriminator::Type(t) => write!(f, "{}()", t.as_deref().unwrap_or("*")),
            Discriminator::SubType(t) => write!(f, "{}?()", t),
            Discriminator::Attr(a) => write!(f, ".{}", a.as_deref().unwrap_or("*")),
            Discriminator::Indice(Some(i)) => write!(f, "[{}]", i),
            Discriminator::Indice(None) => f.write_str("[*]"),
            Discriminator::Key(Some(k)) => write!(f, "{{'{}'}}", k),
            Discriminator::Key(None) => f.write_str("{*}"),
            Discriminator::Event(expr) => write!(f, "?({})", expr),
        }
    }
}

/// Which child collection a length guard counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LenFacet {
    Attrs,
    Indices,
    Keys,
}

/// How many of a synchronization's events must be complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    All,
    Any,
    ExactlyOne,
}

/// Condition checked before an edge fires
#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
    /// Child completions recorded for the current node
    Sync { mode: SyncMode, events: Vec<EventId> },
    /// Child count of the current node
    Len { facet: LenFacet, expected: usize },
    /// A node stored in `reg` sits `depth` levels below the current node
    AncestorDepth {
        reg: DepthReg,
        depth: usize,
        is_min: bool,
    },
    /// Nodes stored in every register share the current node's parent
    SiblingDepth(Vec<DepthReg>),
}

/// Side effect applied when an edge fires
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Capture(String),
    CapturePairFirst(String),
    CapturePairSecond(String),
    /// Record the completion of a child block for the owning node
    Complete(EventId),
    StoreAncestorDepth(DepthReg),
    StoreSiblingDepth(DepthReg),
}

/// Composite transition target
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    State(StateId),
    /// Raise a named event, then continue
    NamedEvent { name: String, next: Box<Target> },
    /// Invoke a hook with the current capture, then continue
    Hook { name: String, next: Box<Target> },
}

impl Target {
    /// The state reached once every wrapper is resolved
    pub fn state(&self) -> StateId {
        match self {
            Target::State(id) => *id,
            Target::NamedEvent { next, .. } | Target::Hook { next, .. } => next.state(),
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, Target::State(_))
    }
}

/// One transition
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub on: Discriminator,
    pub target: Target,
    pub guards: Vec<Guard>,
    pub effects: Vec<Effect>,
    /// Returns to the initial state and finishes the cursor
    pub terminal: bool,
    /// Precondition edges: clean the events that made the expression true
    pub clean_events: bool,
    /// Statement the edge was compiled from
    pub statement: usize,
}

impl Edge {
    /// Number of completions a type edge waits for
    pub(crate) fn required_completions(&self) -> usize {
        self.guards
            .iter()
            .map(|g| match g {
                Guard::Sync {
                    mode: SyncMode::All,
                    events,
                } => events.len(),
                Guard::Sync { .. } => 1,
                _ => 0,
            })
            .sum()
    }
}

/// Exact-key map plus wildcard slot
#[derive(Debug, Clone, PartialEq)]
pub struct Table<K: Ord> {
    exact: BTreeMap<K, Vec<EdgeId>>,
    wildcard: Vec<EdgeId>,
}

impl<K: Ord> Default for Table<K> {
    fn default() -> Self {
        Self {
            exact: BTreeMap::new(),
            wildcard: Vec::new(),
        }
    }
}

impl<K: Ord> Table<K> {
    fn insert(&mut self, key: Option<K>, edge: EdgeId) {
        match key {
            Some(key) => self.exact.entry(key).or_default().push(edge),
            None => self.wildcard.push(edge),
        }
    }

    /// Exact entries for `key` followed by the wildcard slot
    pub fn lookup<Q>(&self, key: Option<&Q>) -> Vec<EdgeId>
    where
        K: std::borrow::Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut out: Vec<EdgeId> = key
            .and_then(|k| self.exact.get(k))
            .cloned()
            .unwrap_or_default();
        out.extend(self.wildcard.iter().copied());
        out
    }

    fn slot(&self, key: Option<&K>) -> &[EdgeId] {
        match key {
            Some(key) => self.exact.get(key).map(Vec::as_slice).unwrap_or(&[]),
            None => &self.wildcard,
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeId> + '_ {
        self.exact
            .values()
            .flatten()
            .chain(self.wildcard.iter())
            .copied()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard.is_empty()
    }
}

/// Node of the automaton
#[derive(Debug, Clone, PartialEq, Default)]
pub struct State {
    values: Table<String>,
    types: Table<String>,
    /// Covariant types in registration order; the first kind-of match wins
    covariant: Vec<(String, Vec<EdgeId>)>,
    attrs: Table<String>,
    indices: Table<usize>,
    keys: Table<String>,
    events: Vec<EdgeId>,
    min_sub_elements: usize,
}

impl State {
    /// Edges for a node whose canonical value is `canonical`
    pub fn value_edges(&self, canonical: Option<&str>) -> Vec<EdgeId> {
        self.values.lookup(canonical)
    }

    /// Edges for a node of `type_name`: exact entries, then the first
    /// registered covariant type it is a kind of, then the wildcard
    pub fn type_edges(&self, type_name: &str, is_kind_of: &dyn Fn(&str) -> bool) -> Vec<EdgeId> {
        let mut out: Vec<EdgeId> = self.types.exact.get(type_name).cloned().unwrap_or_default();
        if let Some((_, edges)) = self.covariant.iter().find(|(name, _)| is_kind_of(name)) {
            out.extend(edges.iter().copied());
        }
        out.extend(self.types.wildcard.iter().copied());
        out
    }

    pub fn attr_edges(&self, name: &str) -> Vec<EdgeId> {
        self.attrs.lookup(Some(name))
    }

    pub fn indice_edges(&self, index: usize) -> Vec<EdgeId> {
        self.indices.lookup(Some(&index))
    }

    pub fn key_edges(&self, key: &str) -> Vec<EdgeId> {
        self.keys.lookup(Some(key))
    }

    pub fn event_edges(&self) -> &[EdgeId] {
        &self.events
    }

    /// Completions that must be attributed to a node before its type is
    /// checked from this state
    pub fn min_sub_elements(&self) -> usize {
        self.min_sub_elements
    }

    /// Every outgoing edge
    pub fn outgoing(&self) -> Vec<EdgeId> {
        let mut out: Vec<EdgeId> = self.values.edges().collect();
        out.extend(self.types.edges());
        out.extend(self.covariant.iter().flat_map(|(_, e)| e.iter().copied()));
        out.extend(self.attrs.edges());
        out.extend(self.indices.edges());
        out.extend(self.keys.edges());
        out.extend(self.events.iter().copied());
        out
    }

    /// Edges registered under exactly this discriminator
    fn slot(&self, on: &Discriminator) -> Vec<EdgeId> {
        match on {
            Discriminator::Value(v) => self.values.slot(v.as_ref()).to_vec(),
            Discriminator::Type(t) => self.types.slot(t.as_ref()).to_vec(),
            Discriminator::SubType(t) => self
                .covariant
                .iter()
                .find(|(name, _)| name == t)
                .map(|(_, e)| e.clone())
                .unwrap_or_default(),
            Discriminator::Attr(a) => self.attrs.slot(a.as_ref()).to_vec(),
            Discriminator::Indice(i) => self.indices.slot(i.as_ref()).to_vec(),
            Discriminator::Key(k) => self.keys.slot(k.as_ref()).to_vec(),
            Discriminator::Event(_) => self.events.clone(),
        }
    }

    fn register(&mut self, on: &Discriminator, edge: EdgeId) {
        match on {
            Discriminator::Value(v) => self.values.insert(v.clone(), edge),
            Discriminator::Type(t) => self.types.insert(t.clone(), edge),
            Discriminator::SubType(t) => {
                match self.covariant.iter_mut().find(|(name, _)| name == t) {
                    Some((_, edges)) => edges.push(edge),
                    None => self.covariant.push((t.clone(), vec![edge])),
                }
            }
            Discriminator::Attr(a) => self.attrs.insert(a.clone(), edge),
            Discriminator::Indice(i) => self.indices.insert(*i, edge),
            Discriminator::Key(k) => self.keys.insert(k.clone(), edge),
            Discriminator::Event(_) => self.events.push(edge),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_lookup_exact_then_wildcard() {
        let mut table: Table<String> = Table::default();
        table.insert(Some("x".to_string()), EdgeId(0));
        table.insert(None, EdgeId(1));

        assert_eq!(table.lookup(Some("x")), vec![EdgeId(0), EdgeId(1)]);
        assert_eq!(table.lookup(Some("y")), vec![EdgeId(1)]);
        assert_eq!(table.lookup::<str>(None), vec![EdgeId(1)]);
    }

    #[test]
    fn test_first_registered_covariant_wins() {
        let mut state = State::default();
        state.register(&Discriminator::SubType("Base".into()), EdgeId(0));
        state.register(&Discriminator::SubType("Derived".into()), EdgeId(1));

        // a Derived node is also a kind of Base
        let derived = |t: &str| t == "Base" || t == "Derived";
        assert_eq!(state.type_edges("Derived", &derived), vec![EdgeId(0)]);

        let base = |t: &str| t == "Base";
        assert_eq!(state.type_edges("Base", &base), vec![EdgeId(0)]);
    }

    #[test]
    fn test_type_dispatch_order() {
        let mut state = State::default();
        state.register(&Discriminator::Type(None), EdgeId(2));
        state.register(&Discriminator::Type(Some("Foo".into())), EdgeId(0));
        state.register(&Discriminator::SubType("Foo".into()), EdgeId(1));

        let is_foo = |t: &str| t == "Foo";
        assert_eq!(
            state.type_edges("Foo", &is_foo),
            vec![EdgeId(0), EdgeId(1), EdgeId(2)]
        );
    }

    #[test]
    fn test_target_resolves_innermost_state() {
        let target = Target::Hook {
            name: "h".into(),
            next: Box::new(Target::NamedEvent {
                name: "e".into(),
                next: Box::new(Target::State(StateId(3))),
            }),
        };
        assert_eq!(target.state(), StateId(3));
        assert!(!target.is_plain());
    }
}
