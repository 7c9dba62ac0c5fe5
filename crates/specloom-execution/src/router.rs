//! Routing decisions.
//!
//! Both routers are pure functions of session state: no side effects, no
//! external calls. The command table is total over all eight commands, so
//! adding a command without a route is a compile error.

use specloom_core::session::{SessionState, UserCommand};
use specloom_core::step::{Next, StepId};

/// Completion percentage at which the spec is preview-ready.
pub const PREVIEW_THRESHOLD: u8 = 80;

/// Safety bound on conversation iterations.
pub const MAX_ITERATIONS: u32 = 20;

/// Router consulted when re-entering at the pause point.
///
/// An unconsumed command is mapped through a fixed table; with no command
/// (or `continue`) the decision falls to the completion percentage:
/// preview-ready specs stay at the pause point, everything else loops back
/// into analysis.
pub fn route_command(state: &SessionState) -> Next {
    match state.last_command {
        Some(UserCommand::AnalyzeTechDebt) => Next::Step(StepId::TechDebt),
        Some(UserCommand::CheckSecurity) => Next::Step(StepId::Security),
        Some(UserCommand::GenerateDiagram) => Next::Step(StepId::Diagram),
        Some(UserCommand::DetectMultiSpec) => Next::Step(StepId::MultiSpec),
        // Preview keeps the session parked at the pause point.
        Some(UserCommand::PreviewSpec) => Next::Step(StepId::WaitInput),
        Some(UserCommand::Export) => Next::End,
        Some(UserCommand::Cancel) => Next::End,
        Some(UserCommand::Continue) | None => {
            if state.completion_percentage >= PREVIEW_THRESHOLD {
                tracing::info!(
                    "[{}] Spec {}% complete, waiting for user decision",
                    state.session_id,
                    state.completion_percentage
                );
                Next::Step(StepId::WaitInput)
            } else {
                tracing::info!(
                    "[{}] Spec {}% complete, continuing conversation",
                    state.session_id,
                    state.completion_percentage
                );
                Next::Step(StepId::Analyze)
            }
        }
    }
}

/// Router consulted after the completion check.
///
/// The iteration safety valve is checked first so a runaway conversation
/// terminates regardless of completion.
pub fn route_completion(state: &SessionState) -> Next {
    if state.iteration_count >= MAX_ITERATIONS {
        tracing::warn!("[{}] Max iterations reached, ending", state.session_id);
        return Next::End;
    }
    if state.completion_percentage >= 100 {
        tracing::info!("[{}] Spec 100% complete, ending", state.session_id);
        return Next::End;
    }
    Next::Step(StepId::WaitInput)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with(completion: u8, command: Option<UserCommand>) -> SessionState {
        let mut state = SessionState::new("s-1");
        state.completion_percentage = completion;
        state.last_command = command;
        state
    }

    #[test]
    fn test_command_table_is_fixed() {
        let cases = [
            (UserCommand::AnalyzeTechDebt, Next::Step(StepId::TechDebt)),
            (UserCommand::CheckSecurity, Next::Step(StepId::Security)),
            (UserCommand::GenerateDiagram, Next::Step(StepId::Diagram)),
            (UserCommand::DetectMultiSpec, Next::Step(StepId::MultiSpec)),
            (UserCommand::PreviewSpec, Next::Step(StepId::WaitInput)),
            (UserCommand::Export, Next::End),
            (UserCommand::Cancel, Next::End),
        ];
        for (command, expected) in cases {
            let state = state_with(0, Some(command));
            assert_eq!(route_command(&state), expected, "command {}", command);
        }
    }

    #[test]
    fn test_export_terminates_at_every_completion() {
        for completion in [0, 10, 50, 79, 80, 99, 100] {
            let state = state_with(completion, Some(UserCommand::Export));
            assert_eq!(route_command(&state), Next::End);
        }
    }

    #[test]
    fn test_cancel_terminates_at_every_completion() {
        for completion in [0, 50, 100] {
            let state = state_with(completion, Some(UserCommand::Cancel));
            assert_eq!(route_command(&state), Next::End);
        }
    }

    #[test]
    fn test_no_command_routes_on_completion() {
        assert_eq!(
            route_command(&state_with(79, None)),
            Next::Step(StepId::Analyze)
        );
        assert_eq!(
            route_command(&state_with(80, None)),
            Next::Step(StepId::WaitInput)
        );
        // `continue` behaves like no command.
        assert_eq!(
            route_command(&state_with(30, Some(UserCommand::Continue))),
            Next::Step(StepId::Analyze)
        );
    }

    #[test]
    fn test_completion_router_safety_valve_first() {
        let mut state = state_with(0, None);
        state.iteration_count = 21;
        assert_eq!(route_completion(&state), Next::End);

        // The valve wins even over a low completion.
        state.iteration_count = MAX_ITERATIONS;
        assert_eq!(route_completion(&state), Next::End);
    }

    #[test]
    fn test_completion_router_thresholds() {
        let mut state = state_with(100, None);
        assert_eq!(route_completion(&state), Next::End);

        state.completion_percentage = 99;
        assert_eq!(route_completion(&state), Next::Step(StepId::WaitInput));

        state.completion_percentage = 0;
        assert_eq!(route_completion(&state), Next::Step(StepId::WaitInput));
    }
}
