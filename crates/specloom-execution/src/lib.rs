//! Workflow execution for Specloom.
//!
//! This crate holds the conversation workflow engine: the step/edge graph,
//! the pure routers, and the step executors that call external capabilities.
//! The engine drives a session from a resume point to the next interrupt or
//! terminal, applying the state reducer after every step. It never persists
//! anything; checkpoint writes belong to the session manager.

pub mod executor;
pub mod graph;
pub mod prompts;
pub mod router;
pub mod steps;

pub use executor::StepExecutor;
pub use graph::{
    standard_workflow, CompiledWorkflow, Edge, RouterKind, RunOutcome, RunReport, StepSnapshot,
    WorkflowBuilder,
};
pub use router::{route_command, route_completion, MAX_ITERATIONS, PREVIEW_THRESHOLD};
