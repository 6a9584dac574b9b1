use mate_model::observation::{Action, ScreenObservation};
use serde::{Deserialize, Serialize};

/// Outcome of applying one action to the live system.
///
/// Produced by the device collaborator and consumed unmodified by the
/// episode loop. Failures are ordinary values, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionOutcome {
    Success,
    SuccessNewState,
    SuccessOutbound,
    FailureAppCrash,
    FailureExecutorError,
    FailureUnknown,
}

impl ExecutionOutcome {
    pub fn is_success(self) -> bool {
        matches!(
            self,
            ExecutionOutcome::Success
                | ExecutionOutcome::SuccessNewState
                | ExecutionOutcome::SuccessOutbound
        )
    }

    /// Whether this outcome ends the current episode.
    pub fn ends_episode(self) -> bool {
        !self.is_success()
    }
}

/// Failure of the device collaborator itself (not of the app under test).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error("observation failed: {0}")]
    Observe(String),

    #[error("reset failed: {0}")]
    Reset(String),

    #[error("device disconnected")]
    Disconnected,
}

/// Trait abstracting the live system the engine explores.
///
/// All calls are synchronous from the engine's point of view; timeouts are
/// the implementor's concern.
pub trait Device {
    /// Snapshot of the current screen.
    fn observe(&mut self) -> Result<ScreenObservation, DeviceError>;

    /// Apply one action.
    fn execute(&mut self, action: &Action) -> ExecutionOutcome;

    /// Restore the system to its initial state.
    fn reset(&mut self) -> Result<(), DeviceError>;
}

impl<D: Device + ?Sized> Device for &mut D {
    fn observe(&mut self) -> Result<ScreenObservation, DeviceError> {
        (**self).observe()
    }

    fn execute(&mut self, action: &Action) -> ExecutionOutcome {
        (**self).execute(action)
    }

    fn reset(&mut self) -> Result<(), DeviceError> {
        (**self).reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_outcomes_end_episode() {
        assert!(!ExecutionOutcome::Success.ends_episode());
        assert!(!ExecutionOutcome::SuccessNewState.ends_episode());
        assert!(!ExecutionOutcome::SuccessOutbound.ends_episode());
        assert!(ExecutionOutcome::FailureAppCrash.ends_episode());
        assert!(ExecutionOutcome::FailureExecutorError.ends_episode());
        assert!(ExecutionOutcome::FailureUnknown.ends_episode());
    }

    #[test]
    fn test_outcome_wire_names() {
        let json = serde_json::to_string(&ExecutionOutcome::FailureAppCrash).unwrap();
        assert_eq!(json, "\"FAILURE_APP_CRASH\"");
    }
}
