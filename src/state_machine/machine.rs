use tracing::{debug, info, warn};

use super::context::Context;
use super::event::Event;
use super::state::State;
use super::transition::{Snapshot, TransitionResult, transition};

/// Owns one run's snapshot and applies events to it one at a time.
///
/// `dispatch` takes `&mut self`, so concurrent callers must go through a
/// single owner (see [`crate::runtime::FsmRuntime`]).
#[derive(Debug, Clone, Default)]
pub struct StateMachine {
    snapshot: Snapshot,
    state_history: Vec<State>,
}

impl StateMachine {
    /// Start a run in `boot`, or in `initial` when given, with `context`.
    pub fn new(initial: Option<State>, context: Context) -> Self {
        Self::from_snapshot(Snapshot::new(initial.unwrap_or_default(), context))
    }

    /// Resume a run from a previously persisted snapshot.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            snapshot,
            state_history: Vec::new(),
        }
    }

    pub fn state(&self) -> State {
        self.snapshot.state
    }

    pub fn context(&self) -> &Context {
        &self.snapshot.context
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// States left behind by this instance, oldest first.
    pub fn state_history(&self) -> &[State] {
        &self.state_history
    }

    pub fn is_finished(&self) -> bool {
        self.snapshot.state.is_terminal()
    }

    /// Apply `event`, replace the held snapshot with the result, and return it.
    pub fn dispatch(&mut self, event: Event) -> TransitionResult {
        let result = transition(&self.snapshot, &event);
        let from = self.snapshot.state;
        let reason = result.reason.as_deref().unwrap_or_default();

        if !result.changed {
            debug!(state = %from, event = event.kind(), reason, "event absorbed");
        } else if result.state != from {
            if result.state == State::Failed {
                warn!(
                    from = %from,
                    error = result.context.last_error.as_deref().unwrap_or_default(),
                    "run failed"
                );
            }
            info!(
                from = %from,
                to = %result.state,
                event = event.kind(),
                reason,
                commands = result.commands.len(),
                "state changed"
            );
            self.state_history.push(from);
        } else {
            debug!(
                state = %from,
                event = event.kind(),
                reason,
                commands = result.commands.len(),
                "context updated"
            );
        }

        self.snapshot = result.snapshot();
        result
    }
}
