//! Runtime: cursors walking registers in lockstep with a subject walk
//!
//! A [`LivingContext`] keeps, for every register it runs, a set of
//! [`LivingState`] cursors. The walker reports each node in post-order
//! through the `check_*` operations; every cursor that can consume the
//! check moves along the matching edges (forking when several fire), and
//! `reset_living_state` prunes what can no longer progress before the next
//! node.

mod context;
mod state;

pub use context::LivingContext;
pub use state::{Anchor, LivingState, Position};
