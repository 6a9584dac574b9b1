//! Signals emitted by the episode loop while exploring.
//! These feed run statistics and analytics; they never steer control flow.

use mate_model::graph::StateId;
use mate_model::observation::Action;

use crate::device::ExecutionOutcome;

/// All signal types the episode loop can emit.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalType {
    /// A logical state was discovered for the first time.
    NewState { state: StateId },
    /// A transition was recorded for the first time.
    NewTransition {
        source: StateId,
        target: StateId,
        action: Action,
    },
    /// The app under test crashed.
    Crash { action: Action, state: StateId },
    /// The executor failed (executor error or unknown failure).
    ExecutorFailure {
        action: Action,
        outcome: ExecutionOutcome,
    },
    /// The action left the app under test.
    Outbound { action: Action },
}

/// A signal event with its position in the run.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    /// Episode index within the run.
    pub episode: u64,
    /// Global step counter at emission time.
    pub step: u64,
    /// The signal itself.
    pub signal_type: SignalType,
}
