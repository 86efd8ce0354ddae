//! PSL Core - tree pattern matching over caller-owned subject trees
//!
//! This crate provides:
//! - The pattern AST, its builder and JSON assembly
//! - A compiler from patterns to stack-action basic blocks
//! - State registers: automata built from compiled patterns
//! - Living contexts: multi-cursor simulation driven by a post-order walk
//! - Capture contexts with read/write-back through the subject tree
//! - A reference arena subject tree and walker

pub mod automaton;
pub mod capture;
pub mod compiler;
pub mod errors;
pub mod hooks;
pub mod living;
pub mod logging_facility;
pub mod pattern;
pub mod subject;

// Macros expand to `$crate::psl_core_types::...`
pub use psl_core_types;

// Re-export commonly used types
pub use automaton::{StateId, StateRegister};
pub use capture::{Binding, CaptureContext};
pub use compiler::{compile, CompiledPattern};
pub use errors::{ExError, ExErrorKind, PslError, Result};
pub use hooks::{HookCall, HookRegistry};
pub use living::{LivingContext, LivingState};
pub use pattern::assemble::{assemble, assemble_str};
pub use pattern::{EventExpr, NamedEvents, Pattern, PatternBuilder, PatternId, Scalar, TypeOptions};
pub use subject::{walk, Facet, NodeId, Subject, SubjectTree, Tree};
