//! The compiled workflow graph and its runner.
//!
//! A workflow is built once at service construction: steps are registered,
//! edges declared, and `compile()` validates the structure (declared
//! targets, reachability). Structural errors are fatal at build time and
//! never surface at request time.
//!
//! Execution is sequential and cooperative: the engine runs one step at a
//! time, applies the reducer, records a snapshot, and consults the step's
//! outgoing edge. It pauses *before* the wait-input step runs and resumes
//! by re-entering at that step's router.

use crate::executor::StepExecutor;
use crate::router::{route_command, route_completion, MAX_ITERATIONS, PREVIEW_THRESHOLD};
use crate::steps::core::{
    AnalyzeStep, CheckCompletionStep, GenerateResponseStep, RetrieveContextStep, UpdateSpecStep,
    WaitInputStep,
};
use crate::steps::optional::{DiagramStep, MultiSpecStep, SecurityStep, TechDebtStep};
use specloom_core::capability::{CodeSearchCapability, LanguageCapability};
use specloom_core::error::{Result, SpecloomError};
use specloom_core::session::{merge, SessionState, StateUpdate};
use specloom_core::step::{Next, StepId};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Outgoing edge of a step.
#[derive(Debug, Clone, Copy)]
pub enum Edge {
    /// Unconditional transition.
    Direct(Next),
    /// Conditional transition decided by a router.
    Router(RouterKind),
}

/// The two routers a conditional edge may name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterKind {
    /// `route_completion`, consulted after the completion check.
    Completion,
    /// `route_command`, consulted when re-entering at the pause point.
    Command,
}

impl RouterKind {
    /// Every target this router may return. Used by `compile()` to check
    /// that all conditional targets are declared steps or terminal.
    pub fn targets(&self) -> &'static [Next] {
        match self {
            RouterKind::Completion => &[Next::Step(StepId::WaitInput), Next::End],
            RouterKind::Command => &[
                Next::Step(StepId::Analyze),
                Next::Step(StepId::TechDebt),
                Next::Step(StepId::Security),
                Next::Step(StepId::Diagram),
                Next::Step(StepId::MultiSpec),
                Next::Step(StepId::WaitInput),
                Next::End,
            ],
        }
    }

    fn route(&self, state: &SessionState) -> Next {
        match self {
            RouterKind::Completion => route_completion(state),
            RouterKind::Command => route_command(state),
        }
    }
}

/// Builder collecting steps and edges before validation.
#[derive(Default)]
pub struct WorkflowBuilder {
    steps: HashMap<StepId, Arc<dyn StepExecutor>>,
    edges: HashMap<StepId, Edge>,
}

impl WorkflowBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a step executor under its own id.
    pub fn add_step(mut self, executor: Arc<dyn StepExecutor>) -> Self {
        self.steps.insert(executor.id(), executor);
        self
    }

    /// Declares an unconditional edge.
    pub fn add_edge(mut self, from: StepId, to: Next) -> Self {
        self.edges.insert(from, Edge::Direct(to));
        self
    }

    /// Declares a conditional edge decided by `router`.
    pub fn add_router(mut self, from: StepId, router: RouterKind) -> Self {
        self.edges.insert(from, Edge::Router(router));
        self
    }

    /// Validates the graph and produces a runnable workflow.
    ///
    /// # Errors
    ///
    /// Returns [`SpecloomError::Graph`] when an edge references an
    /// undeclared step, a step has no outgoing edge, or a declared step is
    /// unreachable from the entry step.
    pub fn compile(self) -> Result<CompiledWorkflow> {
        let declared: HashSet<StepId> = self.steps.keys().copied().collect();

        let check_target = |from: StepId, target: Next| -> Result<()> {
            if let Next::Step(step) = target {
                if !declared.contains(&step) {
                    return Err(SpecloomError::graph(format!(
                        "edge from '{}' targets undeclared step '{}'",
                        from, step
                    )));
                }
            }
            Ok(())
        };

        for (&from, edge) in &self.edges {
            if !declared.contains(&from) {
                return Err(SpecloomError::graph(format!(
                    "edge declared for unknown step '{}'",
                    from
                )));
            }
            match edge {
                Edge::Direct(target) => check_target(from, *target)?,
                Edge::Router(router) => {
                    for &target in router.targets() {
                        check_target(from, target)?;
                    }
                }
            }
        }

        for &step in &declared {
            if !self.edges.contains_key(&step) {
                return Err(SpecloomError::graph(format!(
                    "step '{}' has no outgoing edge",
                    step
                )));
            }
        }

        // Reachability from the entry step over all possible transitions.
        let entry = StepId::Analyze;
        if !declared.contains(&entry) {
            return Err(SpecloomError::graph("entry step 'analyze' not declared"));
        }
        let mut reached = HashSet::from([entry]);
        let mut frontier = VecDeque::from([entry]);
        while let Some(step) = frontier.pop_front() {
            let successors: Vec<Next> = match &self.edges[&step] {
                Edge::Direct(target) => vec![*target],
                Edge::Router(router) => router.targets().to_vec(),
            };
            for target in successors {
                if let Next::Step(next) = target {
                    if reached.insert(next) {
                        frontier.push_back(next);
                    }
                }
            }
        }
        if let Some(unreachable) = declared.iter().find(|step| !reached.contains(step)) {
            return Err(SpecloomError::graph(format!(
                "step '{}' is unreachable from '{}'",
                unreachable, entry
            )));
        }

        Ok(CompiledWorkflow {
            steps: self.steps,
            edges: self.edges,
            entry,
        })
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Paused at the interrupt point; resumable at `wait_input`.
    Interrupted,
    /// Reached a terminal transition (or the safety valve).
    Finished,
}

/// State snapshot recorded after one step execution.
#[derive(Debug, Clone)]
pub struct StepSnapshot {
    pub step: StepId,
    pub state: SessionState,
}

/// Result of one engine run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Final merged state.
    pub state: SessionState,
    pub outcome: RunOutcome,
    /// One snapshot per executed step, in execution order. The session
    /// manager turns these into checkpoints; the engine persists nothing.
    pub snapshots: Vec<StepSnapshot>,
}

/// A validated, runnable workflow graph.
pub struct CompiledWorkflow {
    steps: HashMap<StepId, Arc<dyn StepExecutor>>,
    edges: HashMap<StepId, Edge>,
    entry: StepId,
}

impl std::fmt::Debug for CompiledWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledWorkflow")
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .field("entry", &self.entry)
            .finish()
    }
}

impl CompiledWorkflow {
    /// Entry step for fresh sessions.
    pub fn entry(&self) -> StepId {
        self.entry
    }

    /// Drives `state` from `resume` to the next interrupt or terminal.
    ///
    /// Resuming at `wait_input` does not execute a body: the engine
    /// consults the command router directly, consuming the one-shot
    /// command in the process.
    pub async fn run(&self, state: SessionState, resume: StepId) -> Result<RunReport> {
        let mut state = state;
        let mut snapshots = Vec::new();

        let mut next = if resume == StepId::WaitInput {
            self.route_from_wait(&mut state, &mut snapshots)
        } else {
            Next::Step(resume)
        };

        loop {
            let step = match next {
                Next::End => {
                    return Ok(RunReport {
                        state,
                        outcome: RunOutcome::Finished,
                        snapshots,
                    });
                }
                // Interrupt point: checkpoint and hand control back before
                // wait_input runs.
                Next::Step(StepId::WaitInput) => {
                    return Ok(RunReport {
                        state,
                        outcome: RunOutcome::Interrupted,
                        snapshots,
                    });
                }
                Next::Step(step) => step,
            };

            if state.iteration_count > MAX_ITERATIONS {
                tracing::warn!(
                    "[{}] Iteration bound exceeded ({}), forcing terminal",
                    state.session_id,
                    state.iteration_count
                );
                return Ok(RunReport {
                    state,
                    outcome: RunOutcome::Finished,
                    snapshots,
                });
            }

            let executor = self.steps.get(&step).ok_or_else(|| {
                // Unreachable after compile(); kept as a typed error rather
                // than a panic.
                SpecloomError::graph(format!("no executor for step '{}'", step))
            })?;

            let update = match executor.execute(&state).await {
                Ok(update) => update,
                Err(err) => {
                    tracing::error!("[{}] Step '{}' failed: {}", state.session_id, step, err);
                    StateUpdate::degraded(step, err.to_string())
                }
            };
            state = merge(state, update);
            snapshots.push(StepSnapshot {
                step,
                state: state.clone(),
            });

            next = match &self.edges[&step] {
                Edge::Direct(target) => *target,
                Edge::Router(router) => router.route(&state),
            };
        }
    }

    /// Re-entry at the pause point: consult the command router, consume the
    /// one-shot command, and mark the preview flag when the router parked a
    /// complete spec at the pause point.
    fn route_from_wait(
        &self,
        state: &mut SessionState,
        snapshots: &mut Vec<StepSnapshot>,
    ) -> Next {
        let next = route_command(state);
        tracing::debug!(
            "[{}] wait_input router -> {} (command: {:?})",
            state.session_id,
            next,
            state.last_command
        );

        let mut update = StateUpdate::consume_command();
        update.current_step = Some(StepId::WaitInput);
        if next == Next::Step(StepId::WaitInput)
            && state.completion_percentage >= PREVIEW_THRESHOLD
        {
            update.preview_ready = Some(true);
        }

        *state = merge(std::mem::replace(state, SessionState::new("")), update);
        snapshots.push(StepSnapshot {
            step: StepId::WaitInput,
            state: state.clone(),
        });
        next
    }
}

/// Wires the standard specification workflow:
///
/// ```text
/// analyze -> retrieve_context -> generate_response -> update_spec
///     -> check_completion -> (completion router) -> wait_input | end
/// wait_input -> (command router) -> analyze | tech_debt | security
///     | diagram | multi_spec | wait_input | end
/// tech_debt / security / diagram / multi_spec -> wait_input
/// ```
pub fn standard_workflow(
    language: Arc<dyn LanguageCapability>,
    search: Arc<dyn CodeSearchCapability>,
) -> Result<CompiledWorkflow> {
    WorkflowBuilder::new()
        .add_step(Arc::new(AnalyzeStep::new(language.clone())))
        .add_step(Arc::new(RetrieveContextStep::new(search.clone())))
        .add_step(Arc::new(GenerateResponseStep::new(language.clone())))
        .add_step(Arc::new(UpdateSpecStep::new(language.clone())))
        .add_step(Arc::new(CheckCompletionStep))
        .add_step(Arc::new(WaitInputStep))
        .add_step(Arc::new(TechDebtStep::new(language.clone(), search)))
        .add_step(Arc::new(SecurityStep::new(language.clone())))
        .add_step(Arc::new(DiagramStep::new(language.clone())))
        .add_step(Arc::new(MultiSpecStep::new(language)))
        .add_edge(StepId::Analyze, Next::Step(StepId::RetrieveContext))
        .add_edge(StepId::RetrieveContext, Next::Step(StepId::GenerateResponse))
        .add_edge(StepId::GenerateResponse, Next::Step(StepId::UpdateSpec))
        .add_edge(StepId::UpdateSpec, Next::Step(StepId::CheckCompletion))
        .add_router(StepId::CheckCompletion, RouterKind::Completion)
        .add_router(StepId::WaitInput, RouterKind::Command)
        .add_edge(StepId::TechDebt, Next::Step(StepId::WaitInput))
        .add_edge(StepId::Security, Next::Step(StepId::WaitInput))
        .add_edge(StepId::Diagram, Next::Step(StepId::WaitInput))
        .add_edge(StepId::MultiSpec, Next::Step(StepId::WaitInput))
        .compile()
}
