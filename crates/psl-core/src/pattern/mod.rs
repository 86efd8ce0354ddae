//! Pattern AST
//!
//! Patterns are stored in an arena owned by [`Pattern`]. Every node records
//! the handle of the node it was attached to, so a node can belong to exactly
//! one parent and statement membership can be answered without a search.
//! Nodes are created through [`PatternBuilder`], which validates structure as
//! it goes; a finished pattern is immutable.

pub mod assemble;
mod display;
pub mod event_expr;
pub mod scalar;

use std::collections::BTreeSet;

use crate::errors::{PslError, Result};

pub use display::PatternDisplay;
pub use event_expr::{EventExpr, NamedEvents};
pub use scalar::Scalar;

/// Handle to a node in a pattern arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct PatternId(u32);

impl PatternId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Options of a type pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeOptions {
    /// Require the exact number of attributes (and subs, when given)
    pub strict: bool,
    /// Match subtypes too (covariant dispatch)
    pub kind_of: bool,
}

impl Default for TypeOptions {
    fn default() -> Self {
        Self {
            strict: true,
            kind_of: false,
        }
    }
}

impl TypeOptions {
    pub fn lax() -> Self {
        Self {
            strict: false,
            kind_of: false,
        }
    }

    pub fn with_kind_of(mut self) -> Self {
        self.kind_of = true;
        self
    }
}

/// One selector expression
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// Scalar literal, or any node when `None`
    Value(Option<Scalar>),
    Type {
        name: String,
        /// `None` leaves attributes unchecked
        attrs: Option<Vec<PatternId>>,
        /// A `List` or `Dict` matched against the node's indexed/keyed children
        subs: Option<PatternId>,
        strict: bool,
        kind_of: bool,
    },
    Attr {
        name: Option<String>,
        inner: PatternId,
    },
    Indice {
        index: Option<usize>,
        inner: PatternId,
    },
    Key {
        key: Option<String>,
        inner: PatternId,
    },
    List {
        items: Vec<PatternId>,
        strict: bool,
    },
    Dict {
        items: Vec<PatternId>,
        strict: bool,
    },
    /// `right` sits `depth` levels below `left` (at least `depth` when `is_min`)
    Ancestor {
        left: PatternId,
        right: PatternId,
        depth: usize,
        is_min: bool,
    },
    Sibling {
        items: Vec<PatternId>,
    },
    Capture {
        name: String,
        inner: PatternId,
        pair: bool,
    },
    NamedEvent {
        name: String,
        inner: PatternId,
    },
    Precondition {
        inner: PatternId,
        expr: EventExpr,
        clean: bool,
    },
    Hook {
        name: String,
        inner: PatternId,
    },
    Block {
        statements: Vec<PatternId>,
    },
}

impl PatternKind {
    pub fn variant_name(&self) -> &'static str {
        match self {
            PatternKind::Value(_) => "Value",
            PatternKind::Type { .. } => "Type",
            PatternKind::Attr { .. } => "Attr",
            PatternKind::Indice { .. } => "Indice",
            PatternKind::Key { .. } => "Key",
            PatternKind::List { .. } => "List",
            PatternKind::Dict { .. } => "Dict",
            PatternKind::Ancestor { .. } => "Ancestor",
            PatternKind::Sibling { .. } => "Sibling",
            PatternKind::Capture { .. } => "Capture",
            PatternKind::NamedEvent { .. } => "NamedEvent",
            PatternKind::Precondition { .. } => "Precondition",
            PatternKind::Hook { .. } => "Hook",
            PatternKind::Block { .. } => "Block",
        }
    }

    /// Direct children in compilation order
    pub fn children(&self) -> Vec<PatternId> {
        match self {
            PatternKind::Value(_) => Vec::new(),
            PatternKind::Type { attrs, subs, .. } => subs
                .iter()
                .copied()
                .chain(attrs.iter().flatten().copied())
                .collect(),
            PatternKind::Attr { inner, .. }
            | PatternKind::Indice { inner, .. }
            | PatternKind::Key { inner, .. }
            | PatternKind::Capture { inner, .. }
            | PatternKind::NamedEvent { inner, .. }
            | PatternKind::Precondition { inner, .. }
            | PatternKind::Hook { inner, .. } => vec![*inner],
            PatternKind::List { items, .. }
            | PatternKind::Dict { items, .. }
            | PatternKind::Sibling { items } => items.clone(),
            PatternKind::Ancestor { left, right, .. } => vec![*right, *left],
            PatternKind::Block { statements } => statements.clone(),
        }
    }
}

/// Arena slot: the expression plus the node it is attached to
#[derive(Debug, Clone, PartialEq)]
pub struct PatternNode {
    kind: PatternKind,
    parent: Option<PatternId>,
}

impl PatternNode {
    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    pub fn parent(&self) -> Option<PatternId> {
        self.parent
    }
}

/// A finished, immutable pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    nodes: Vec<PatternNode>,
    root: PatternId,
}

impl Pattern {
    pub fn root(&self) -> PatternId {
        self.root
    }

    /// Get a node by handle
    ///
    /// # Errors
    ///
    /// Returns `UnknownPatternNode` if the handle belongs to another arena.
    pub fn node(&self, id: PatternId) -> Result<&PatternNode> {
        self.nodes
            .get(id.index())
            .ok_or(PslError::UnknownPatternNode { node: id.raw() })
    }

    /// Get the expression of a node
    ///
    /// # Errors
    ///
    /// Returns `UnknownPatternNode` if the handle belongs to another arena.
    pub fn kind(&self, id: PatternId) -> Result<&PatternKind> {
        self.node(id).map(PatternNode::kind)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level statements: the children of a root block, or the root itself
    pub fn statements(&self) -> Vec<PatternId> {
        match self.nodes.get(self.root.index()).map(PatternNode::kind) {
            Some(PatternKind::Block { statements }) => statements.clone(),
            _ => vec![self.root],
        }
    }

    /// Index of the statement containing `id`
    ///
    /// # Errors
    ///
    /// Returns `UnknownPatternNode` if `id` is not reachable from the root.
    pub fn statement_of(&self, id: PatternId) -> Result<usize> {
        let statements = self.statements();
        let mut current = id;
        loop {
            if let Some(pos) = statements.iter().position(|s| *s == current) {
                return Ok(pos);
            }
            match self.node(current)?.parent {
                Some(parent) => current = parent,
                None => return Err(PslError::UnknownPatternNode { node: id.raw() }),
            }
        }
    }

    /// Nodes reachable from the root, parents before children
    pub fn descendants(&self) -> Vec<PatternId> {
        let mut out = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id.index()) {
                out.push(id);
                stack.extend(node.kind.children().into_iter().rev());
            }
        }
        out
    }

    /// Names of every hook used by the pattern
    pub fn hook_names(&self) -> BTreeSet<&str> {
        self.descendants()
            .into_iter()
            .filter_map(|id| match &self.nodes[id.index()].kind {
                PatternKind::Hook { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Names of every named event raised by the pattern
    pub fn named_events(&self) -> BTreeSet<&str> {
        self.descendants()
            .into_iter()
            .filter_map(|id| match &self.nodes[id.index()].kind {
                PatternKind::NamedEvent { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// PSL text of a sub-pattern
    pub fn display(&self, id: PatternId) -> PatternDisplay<'_> {
        PatternDisplay::new(self, id)
    }
}

impl std::fmt::Display for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display(self.root))
    }
}

/// Incremental constructor for a [`Pattern`]
///
/// Every method validates its children: they must exist, must not be
/// attached elsewhere and must be of the variant the parent expects.
#[derive(Debug, Default)]
pub struct PatternBuilder {
    nodes: Vec<PatternNode>,
}

impl PatternBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Literal value pattern
    pub fn value(&mut self, literal: impl Into<Scalar>) -> PatternId {
        self.push(PatternKind::Value(Some(literal.into())))
    }

    /// Wildcard value pattern
    pub fn any_value(&mut self) -> PatternId {
        self.push(PatternKind::Value(None))
    }

    /// Type pattern with optional attributes and subs
    ///
    /// Attributes are kept sorted by name.
    ///
    /// # Errors
    ///
    /// Fails if the name is empty, an attribute is not an `Attr` pattern or
    /// `subs` is not a `List`/`Dict`.
    pub fn type_match(
        &mut self,
        name: &str,
        attrs: Option<Vec<PatternId>>,
        subs: Option<PatternId>,
        options: TypeOptions,
    ) -> Result<PatternId> {
        non_empty("type", name)?;
        let attrs = match attrs {
            Some(mut attrs) => {
                for attr in &attrs {
                    self.require("Type attrs", *attr, "Attr", |k| {
                        matches!(k, PatternKind::Attr { .. })
                    })?;
                }
                attrs.sort_by_key(|id| match &self.nodes[id.index()].kind {
                    PatternKind::Attr { name, .. } => name.clone(),
                    _ => None,
                });
                Some(attrs)
            }
            None => None,
        };
        if let Some(subs) = subs {
            self.require("Type subs", subs, "List or Dict", |k| {
                matches!(k, PatternKind::List { .. } | PatternKind::Dict { .. })
            })?;
        }
        self.adopt(PatternKind::Type {
            name: name.to_string(),
            attrs,
            subs,
            strict: options.strict,
            kind_of: options.kind_of,
        })
    }

    /// Bare type pattern
    ///
    /// # Errors
    ///
    /// Fails if the name is empty.
    pub fn ty(&mut self, name: &str) -> Result<PatternId> {
        self.type_match(name, None, None, TypeOptions::default())
    }

    /// Attribute pattern; `None` matches any attribute name
    ///
    /// # Errors
    ///
    /// Fails if `inner` cannot be attached.
    pub fn attr(&mut self, name: Option<&str>, inner: PatternId) -> Result<PatternId> {
        if let Some(name) = name {
            non_empty("attribute", name)?;
        }
        self.adopt(PatternKind::Attr {
            name: name.map(str::to_string),
            inner,
        })
    }

    /// Indexed child pattern; `None` matches any index
    ///
    /// # Errors
    ///
    /// Fails if `inner` cannot be attached.
    pub fn indice(&mut self, index: Option<usize>, inner: PatternId) -> Result<PatternId> {
        self.adopt(PatternKind::Indice { index, inner })
    }

    /// Keyed child pattern; `None` matches any key
    ///
    /// # Errors
    ///
    /// Fails if `inner` cannot be attached.
    pub fn key(&mut self, key: Option<&str>, inner: PatternId) -> Result<PatternId> {
        self.adopt(PatternKind::Key {
            key: key.map(str::to_string),
            inner,
        })
    }

    /// Unordered list of indexed children, kept sorted by index
    ///
    /// # Errors
    ///
    /// Fails if an item is not an `Indice` pattern.
    pub fn list(&mut self, mut items: Vec<PatternId>, strict: bool) -> Result<PatternId> {
        for item in &items {
            self.require("List items", *item, "Indice", |k| {
                matches!(k, PatternKind::Indice { .. })
            })?;
        }
        items.sort_by_key(|id| match &self.nodes[id.index()].kind {
            PatternKind::Indice { index, .. } => *index,
            _ => None,
        });
        self.adopt(PatternKind::List { items, strict })
    }

    /// Unordered set of keyed children, kept sorted by key
    ///
    /// # Errors
    ///
    /// Fails if an item is not a `Key` pattern.
    pub fn dict(&mut self, mut items: Vec<PatternId>, strict: bool) -> Result<PatternId> {
        for item in &items {
            self.require("Dict items", *item, "Key", |k| {
                matches!(k, PatternKind::Key { .. })
            })?;
        }
        items.sort_by_key(|id| match &self.nodes[id.index()].kind {
            PatternKind::Key { key, .. } => key.clone(),
            _ => None,
        });
        self.adopt(PatternKind::Dict { items, strict })
    }

    /// `right` must sit `depth` levels below `left` (or at least `depth`)
    ///
    /// # Errors
    ///
    /// Returns `InvalidAncestorDepth` when `depth < 1`.
    pub fn ancestor(
        &mut self,
        left: PatternId,
        right: PatternId,
        depth: usize,
        is_min: bool,
    ) -> Result<PatternId> {
        if depth < 1 {
            return Err(PslError::InvalidAncestorDepth { depth });
        }
        self.adopt(PatternKind::Ancestor {
            left,
            right,
            depth,
            is_min,
        })
    }

    /// Items matching at equal depth
    ///
    /// Unattached nested sibling patterns are flattened into one chain and
    /// absorbed: they hang off the new chain and cannot be attached again.
    ///
    /// # Errors
    ///
    /// Fails with fewer than two items.
    pub fn sibling(&mut self, items: Vec<PatternId>) -> Result<PatternId> {
        let mut flat = Vec::with_capacity(items.len());
        let mut absorbed = Vec::new();
        for item in items {
            match self.kind_of(item)? {
                PatternKind::Sibling { items: nested }
                    if self.nodes[item.index()].parent.is_none() =>
                {
                    flat.extend(nested.iter().copied());
                    absorbed.push(item);
                }
                _ => flat.push(item),
            }
        }
        if flat.len() < 2 {
            return Err(PslError::UnexpectedPattern {
                context: "Sibling".to_string(),
                expected: "at least two items".to_string(),
                found: format!("{} item(s)", flat.len()),
            });
        }

        self.set_item_parents(&absorbed, None)?;
        match self.adopt(PatternKind::Sibling { items: flat }) {
            Ok(id) => {
                for chain in absorbed {
                    self.nodes[chain.index()].parent = Some(id);
                }
                Ok(id)
            }
            Err(e) => {
                for chain in &absorbed {
                    self.set_item_parents(std::slice::from_ref(chain), Some(*chain))?;
                }
                Err(e)
            }
        }
    }

    fn set_item_parents(&mut self, chains: &[PatternId], parent: Option<PatternId>) -> Result<()> {
        for chain in chains {
            let items = self.kind_of(*chain)?.children();
            for item in items {
                self.nodes[item.index()].parent = parent;
            }
        }
        Ok(())
    }

    /// Bind the subject matched by `inner` to `name`
    ///
    /// # Errors
    ///
    /// Fails if the name is empty.
    pub fn capture(&mut self, name: &str, inner: PatternId) -> Result<PatternId> {
        non_empty("capture", name)?;
        self.adopt(PatternKind::Capture {
            name: name.to_string(),
            inner,
            pair: false,
        })
    }

    /// Bind both the index/key and the child matched by `inner`
    ///
    /// # Errors
    ///
    /// Fails if the name is empty or `inner` is not `Indice`/`Key`.
    pub fn capture_pair(&mut self, name: &str, inner: PatternId) -> Result<PatternId> {
        non_empty("capture", name)?;
        self.require("Capture pair", inner, "Indice or Key", |k| {
            matches!(k, PatternKind::Indice { .. } | PatternKind::Key { .. })
        })?;
        self.adopt(PatternKind::Capture {
            name: name.to_string(),
            inner,
            pair: true,
        })
    }

    /// Raise a named event when `inner` matches
    ///
    /// # Errors
    ///
    /// Fails if the name is empty.
    pub fn named_event(&mut self, name: &str, inner: PatternId) -> Result<PatternId> {
        non_empty("event", name)?;
        self.adopt(PatternKind::NamedEvent {
            name: name.to_string(),
            inner,
        })
    }

    /// Continue past `inner` only while `expr` holds
    ///
    /// # Errors
    ///
    /// Fails if `inner` cannot be attached.
    pub fn precondition(
        &mut self,
        inner: PatternId,
        expr: EventExpr,
        clean: bool,
    ) -> Result<PatternId> {
        self.adopt(PatternKind::Precondition { inner, expr, clean })
    }

    /// Invoke the named hook when `inner` matches
    ///
    /// # Errors
    ///
    /// Fails if the name is empty.
    pub fn hook(&mut self, name: &str, inner: PatternId) -> Result<PatternId> {
        non_empty("hook", name)?;
        self.adopt(PatternKind::Hook {
            name: name.to_string(),
            inner,
        })
    }

    /// Finish with a single statement as root
    ///
    /// # Errors
    ///
    /// Fails if `root` is unknown or already attached.
    pub fn finish(self, root: PatternId) -> Result<Pattern> {
        let node = self
            .nodes
            .get(root.index())
            .ok_or(PslError::UnknownPatternNode { node: root.raw() })?;
        if node.parent.is_some() {
            return Err(PslError::NodeAlreadyAttached { node: root.raw() });
        }
        Ok(Pattern {
            nodes: self.nodes,
            root,
        })
    }

    /// Finish with a block of independent statements as root
    ///
    /// # Errors
    ///
    /// Fails if a statement cannot be attached.
    pub fn block(mut self, statements: Vec<PatternId>) -> Result<Pattern> {
        let root = self.adopt(PatternKind::Block { statements })?;
        Ok(Pattern {
            nodes: self.nodes,
            root,
        })
    }

    fn push(&mut self, kind: PatternKind) -> PatternId {
        let id = PatternId(self.nodes.len() as u32);
        self.nodes.push(PatternNode { kind, parent: None });
        id
    }

    fn kind_of(&self, id: PatternId) -> Result<&PatternKind> {
        self.nodes
            .get(id.index())
            .map(PatternNode::kind)
            .ok_or(PslError::UnknownPatternNode { node: id.raw() })
    }

    fn require(
        &self,
        context: &str,
        id: PatternId,
        expected: &str,
        accepts: impl Fn(&PatternKind) -> bool,
    ) -> Result<()> {
        let kind = self.kind_of(id)?;
        if accepts(kind) {
            Ok(())
        } else {
            Err(PslError::UnexpectedPattern {
                context: context.to_string(),
                expected: expected.to_string(),
                found: kind.variant_name().to_string(),
            })
        }
    }

    /// Push `kind` and point its children back at it
    fn adopt(&mut self, kind: PatternKind) -> Result<PatternId> {
        let children = kind.children();
        let mut seen = BTreeSet::new();
        for child in &children {
            let node = self
                .nodes
                .get(child.index())
                .ok_or(PslError::UnknownPatternNode { node: child.raw() })?;
            if matches!(node.kind, PatternKind::Block { .. }) {
                return Err(PslError::UnexpectedPattern {
                    context: kind.variant_name().to_string(),
                    expected: "a statement".to_string(),
                    found: "Block".to_string(),
                });
            }
            if node.parent.is_some() || !seen.insert(*child) {
                return Err(PslError::NodeAlreadyAttached { node: child.raw() });
            }
        }
        let id = self.push(kind);
        for child in children {
            self.nodes[child.index()].parent = Some(id);
        }
        Ok(id)
    }
}

fn non_empty(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        Err(PslError::EmptyName {
            what: what.to_string(),
        })
    } else {
        Ok(())
    }
}
