//! Step executors for the specification workflow.
//!
//! `core` holds the main authoring loop; `optional` holds the
//! command-triggered analysis steps.

pub mod core;
pub mod optional;
