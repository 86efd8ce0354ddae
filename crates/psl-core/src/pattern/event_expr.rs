//! Boolean expressions over named events
//!
//! Preconditions guard a transition on the set of named events raised so far
//! in the walk. Evaluation reports which names made the expression true so
//! the owning precondition can clean them afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Table of named events currently raised in one living context
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedEvents {
    raised: BTreeSet<String>,
}

impl NamedEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise an event; returns `false` if it was already raised
    pub fn raise(&mut self, name: &str) -> bool {
        self.raised.insert(name.to_string())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.raised.contains(name)
    }

    /// Remove every name in `names`
    pub fn clean<'a>(&mut self, names: impl IntoIterator<Item = &'a String>) {
        for name in names {
            self.raised.remove(name);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.raised.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.raised.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raised.is_empty()
    }
}

/// Event expression attached to a precondition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventExpr {
    /// True iff the name is raised
    Named(String),
    /// All operands true
    And(Vec<EventExpr>),
    /// At least one operand true
    Or(Vec<EventExpr>),
    /// Exactly one operand true
    Xor(Vec<EventExpr>),
    /// Inverts its operand; names seen by the operand are never collected
    Not(Box<EventExpr>),
    /// Grouping only
    Paren(Box<EventExpr>),
}

impl EventExpr {
    pub fn named(name: impl Into<String>) -> Self {
        EventExpr::Named(name.into())
    }

    pub fn and(operands: impl IntoIterator<Item = EventExpr>) -> Self {
        EventExpr::And(operands.into_iter().collect())
    }

    pub fn or(operands: impl IntoIterator<Item = EventExpr>) -> Self {
        EventExpr::Or(operands.into_iter().collect())
    }

    pub fn xor(operands: impl IntoIterator<Item = EventExpr>) -> Self {
        EventExpr::Xor(operands.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(operand: EventExpr) -> Self {
        EventExpr::Not(Box::new(operand))
    }

    pub fn paren(operand: EventExpr) -> Self {
        EventExpr::Paren(Box::new(operand))
    }

    /// Evaluate against `table`, adding the names responsible for a true
    /// result to `collected`
    ///
    /// `collected` is only extended when the result is true. The table is
    /// never modified here.
    pub fn evaluate(&self, table: &NamedEvents, collected: &mut BTreeSet<String>) -> bool {
        match self {
            EventExpr::Named(name) => {
                if table.contains(name) {
                    collected.insert(name.clone());
                    true
                } else {
                    false
                }
            }
            EventExpr::And(operands) => {
                let mut scratch = BTreeSet::new();
                for operand in operands {
                    if !operand.evaluate(table, &mut scratch) {
                        return false;
                    }
                }
                collected.extend(scratch);
                true
            }
            EventExpr::Or(operands) => {
                let mut any = false;
                for operand in operands {
                    any |= operand.evaluate(table, collected);
                }
                any
            }
            EventExpr::Xor(operands) => {
                let mut winner = None;
                let mut hits = 0;
                for operand in operands {
                    let mut scratch = BTreeSet::new();
                    if operand.evaluate(table, &mut scratch) {
                        hits += 1;
                        winner = Some(scratch);
                    }
                }
                match (hits, winner) {
                    (1, Some(scratch)) => {
                        collected.extend(scratch);
                        true
                    }
                    _ => false,
                }
            }
            EventExpr::Not(operand) => {
                let mut isolated = BTreeSet::new();
                !operand.evaluate(table, &mut isolated)
            }
            EventExpr::Paren(operand) => operand.evaluate(table, collected),
        }
    }

    /// Every name referenced by the expression
    pub fn names(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            EventExpr::Named(name) => {
                out.insert(name.as_str());
            }
            EventExpr::And(operands) | EventExpr::Or(operands) | EventExpr::Xor(operands) => {
                for operand in operands {
                    operand.collect_names(out);
                }
            }
            EventExpr::Not(operand) | EventExpr::Paren(operand) => operand.collect_names(out),
        }
    }
}

fn join(f: &mut std::fmt::Formatter<'_>, operands: &[EventExpr], sep: &str) -> std::fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", operand)?;
    }
    Ok(())
}

impl std::fmt::Display for EventExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventExpr::Named(name) => f.write_str(name),
            EventExpr::And(operands) => join(f, operands, " & "),
            EventExpr::Or(operands) => join(f, operands, " | "),
            EventExpr::Xor(operands) => join(f, operands, " ^ "),
            EventExpr::Not(operand) => write!(f, "!{}", operand),
            EventExpr::Paren(operand) => write!(f, "({})", operand),
        }
    }
}
