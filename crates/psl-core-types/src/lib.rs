//! Core types shared across the PSL crates
//!
//! - **Correlation**: `WalkId` tags every log event emitted while one
//!   living context drives a tree walk
//! - **Schema constants**: canonical field keys and event names used by the
//!   logging macros and the test capture layer

pub mod correlation;
pub mod schema;

pub use correlation::WalkId;
