//! Stack actions and basic blocks
//!
//! A basic block is the straight-line instruction sequence the automaton
//! builder threads into one path of states. Discriminant actions consume a
//! walker callback; every other action decorates the most recent
//! discriminant (guards, effects, targets).

use std::fmt;

use crate::pattern::EventExpr;

/// Completion event of a child block, consumed by a synchronizing block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EventId(pub(crate) u32);

impl EventId {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Register recording the position of a matched node for relation checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct DepthReg(pub(crate) u32);

impl DepthReg {
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for DepthReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// One compiled instruction
#[derive(Debug, Clone, PartialEq)]
pub enum StackAction {
    // Discriminants
    /// Canonical literal, or any value
    Value(Option<String>),
    /// Exact type name, or any type
    Type(Option<String>),
    /// Covariant type name
    SubType(String),
    Attr(Option<String>),
    Key(Option<String>),
    Indice(Option<usize>),

    // Facet markers
    EndNode,
    EndAttrs,
    EndIndices,
    EndKeys,

    // Synchronization
    SetEvent(EventId),
    CheckCleanEventAnd(Vec<EventId>),
    /// Only in hand-assembled blocks; compiled children always sync with `And`
    CheckCleanEventOr(Vec<EventId>),
    /// Only in hand-assembled blocks
    CheckCleanEventXor(Vec<EventId>),
    CheckLen(usize),
    CheckAttrLen(usize),

    // Captures
    Capture(String),
    CapturePairFirst(String),
    CapturePairSecond(String),

    // Terminals and named events
    Hook(String),
    SetNamedEvent(String),
    CheckNamedEvent(EventExpr),
    PostponeCleanNamedEvent,

    // Relations
    StoreAncestorDepth(DepthReg),
    CheckAncestorDepth {
        reg: DepthReg,
        depth: usize,
        is_min: bool,
    },
    StoreSiblingDepth(DepthReg),
    CheckSiblingDepth(Vec<DepthReg>),
}

impl StackAction {
    /// Actions that consume a walker callback
    pub fn is_discriminant(&self) -> bool {
        matches!(
            self,
            StackAction::Value(_)
                | StackAction::Type(_)
                | StackAction::SubType(_)
                | StackAction::Attr(_)
                | StackAction::Key(_)
                | StackAction::Indice(_)
                | StackAction::CheckNamedEvent(_)
        )
    }

    pub fn opcode(&self) -> &'static str {
        match self {
            StackAction::Value(_) => "value",
            StackAction::Type(_) => "type",
            StackAction::SubType(_) => "subtype",
            StackAction::Attr(_) => "attr",
            StackAction::Key(_) => "key",
            StackAction::Indice(_) => "indice",
            StackAction::EndNode => "end_node",
            StackAction::EndAttrs => "end_attrs",
            StackAction::EndIndices => "end_indices",
            StackAction::EndKeys => "end_keys",
            StackAction::SetEvent(_) => "set_event",
            StackAction::CheckCleanEventAnd(_) => "check_clean_event_and",
            StackAction::CheckCleanEventOr(_) => "check_clean_event_or",
            StackAction::CheckCleanEventXor(_) => "check_clean_event_xor",
            StackAction::CheckLen(_) => "check_len",
            StackAction::CheckAttrLen(_) => "check_attr_len",
            StackAction::Capture(_) => "capture",
            StackAction::CapturePairFirst(_) => "capture_pair_first",
            StackAction::CapturePairSecond(_) => "capture_pair_second",
            StackAction::Hook(_) => "hook",
            StackAction::SetNamedEvent(_) => "set_named_event",
            StackAction::CheckNamedEvent(_) => "check_named_event",
            StackAction::PostponeCleanNamedEvent => "postpone_clean_named_event",
            StackAction::StoreAncestorDepth(_) => "store_ancestor_depth",
            StackAction::CheckAncestorDepth { .. } => "check_ancestor_depth",
            StackAction::StoreSiblingDepth(_) => "store_sibling_depth",
            StackAction::CheckSiblingDepth(_) => "check_sibling_depth",
        }
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for StackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.opcode())?;
        match self {
            StackAction::Value(v) | StackAction::Type(v) | StackAction::Attr(v) | StackAction::Key(v) => {
                write!(f, " {}", v.as_deref().unwrap_or("*"))
            }
            StackAction::Indice(Some(i)) => write!(f, " {}", i),
            StackAction::Indice(None) => f.write_str(" *"),
            StackAction::SubType(name)
            | StackAction::Capture(name)
            | StackAction::CapturePairFirst(name)
            | StackAction::CapturePairSecond(name)
            | StackAction::Hook(name)
            | StackAction::SetNamedEvent(name) => write!(f, " {}", name),
            StackAction::SetEvent(ev) => write!(f, " {}", ev),
            StackAction::CheckCleanEventAnd(evs)
            | StackAction::CheckCleanEventOr(evs)
            | StackAction::CheckCleanEventXor(evs) => {
                f.write_str(" ")?;
                join(f, evs)
            }
            StackAction::CheckLen(n) | StackAction::CheckAttrLen(n) => write!(f, " {}", n),
            StackAction::CheckNamedEvent(expr) => write!(f, " {}", expr),
            StackAction::StoreAncestorDepth(reg) | StackAction::StoreSiblingDepth(reg) => {
                write!(f, " {}", reg)
            }
            StackAction::CheckAncestorDepth { reg, depth, is_min } => {
                write!(f, " {} {}{}", reg, if *is_min { ">=" } else { "==" }, depth)
            }
            StackAction::CheckSiblingDepth(regs) => {
                f.write_str(" ")?;
                join(f, regs)
            }
            StackAction::EndNode
            | StackAction::EndAttrs
            | StackAction::EndIndices
            | StackAction::EndKeys
            | StackAction::PostponeCleanNamedEvent => Ok(()),
        }
    }
}

/// Straight-line action sequence of one statement
#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    /// Index of the statement the block was compiled from
    pub statement: usize,
    pub actions: Vec<StackAction>,
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.statement)?;
        for action in &self.actions {
            write!(f, " {};", action)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discriminants() {
        assert!(StackAction::Value(None).is_discriminant());
        assert!(StackAction::CheckNamedEvent(EventExpr::named("a")).is_discriminant());
        assert!(!StackAction::EndNode.is_discriminant());
        assert!(!StackAction::SetEvent(EventId(0)).is_discriminant());
    }

    #[test]
    fn test_action_text() {
        assert_eq!(StackAction::Value(Some("1".into())).to_string(), "value 1");
        assert_eq!(StackAction::Type(None).to_string(), "type *");
        assert_eq!(
            StackAction::CheckCleanEventAnd(vec![EventId(0), EventId(1)]).to_string(),
            "check_clean_event_and e0,e1"
        );
        assert_eq!(
            StackAction::CheckAncestorDepth {
                reg: DepthReg(2),
                depth: 3,
                is_min: true
            }
            .to_string(),
            "check_ancestor_depth r2 >=3"
        );
    }
}
