use std::sync::Arc;

use mate_model::graph::StateId;
use mate_model::observation::Action;
use serde::{Deserialize, Serialize};

use crate::device::ExecutionOutcome;

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeEnd {
    /// Reached the maximum episode length.
    MaxLength,
    /// The selector had no further action.
    NoAction,
    /// The stop predicate fired.
    Stopped,
    /// The app under test crashed.
    Crash,
    /// The executor reported an error.
    ExecutorError,
    /// The executor reported an unknown failure.
    UnknownFailure,
    /// A termination condition fired mid-episode.
    Terminated,
}

impl EpisodeEnd {
    pub fn from_outcome(outcome: ExecutionOutcome) -> Option<Self> {
        match outcome {
            ExecutionOutcome::FailureAppCrash => Some(EpisodeEnd::Crash),
            ExecutionOutcome::FailureExecutorError => Some(EpisodeEnd::ExecutorError),
            ExecutionOutcome::FailureUnknown => Some(EpisodeEnd::UnknownFailure),
            _ => None,
        }
    }
}

/// One bounded action sequence executed from a reset point.
///
/// `states[0]` is the state observed after reset; `states[i + 1]` is the
/// state reached by `actions[i]`. A crash whose resulting screen could not
/// be observed leaves `states` one entry short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    actions: Vec<Action>,
    states: Vec<StateId>,
    outcomes: Vec<ExecutionOutcome>,
    /// States discovered for the first time by this episode.
    discovered: usize,
    end: EpisodeEnd,
}

impl Episode {
    pub fn new(initial_state: StateId, initial_was_new: bool) -> Self {
        Self {
            actions: Vec::new(),
            states: vec![initial_state],
            outcomes: Vec::new(),
            discovered: usize::from(initial_was_new),
            end: EpisodeEnd::MaxLength,
        }
    }

    pub(crate) fn push(
        &mut self,
        action: Action,
        outcome: ExecutionOutcome,
        reached: Option<(StateId, bool)>,
    ) {
        self.actions.push(action);
        self.outcomes.push(outcome);
        if let Some((state, is_new)) = reached {
            self.states.push(state);
            if is_new {
                self.discovered += 1;
            }
        }
    }

    pub(crate) fn finish(&mut self, end: EpisodeEnd) {
        self.end = end;
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn states(&self) -> &[StateId] {
        &self.states
    }

    pub fn outcomes(&self) -> &[ExecutionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn end(&self) -> EpisodeEnd {
        self.end
    }

    pub fn crashed(&self) -> bool {
        self.end == EpisodeEnd::Crash
    }

    pub fn discovered_states(&self) -> usize {
        self.discovered
    }

    pub fn distinct_states(&self) -> usize {
        let mut ids = self.states.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.len()
    }

    /// Stable fingerprint of the state path, for path-frequency counting.
    pub fn path_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};
        let mut hasher = DefaultHasher::new();
        self.states.hash(&mut hasher);
        hasher.finish()
    }
}

/// Immutable, cheaply cloned wrapper around one generated test case.
///
/// Every search algorithm hands chromosomes to the same fitness and
/// termination code regardless of how they were produced.
#[derive(Debug)]
pub struct Chromosome<T> {
    value: Arc<T>,
}

impl<T> Chromosome<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Arc::new(value),
        }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    /// Whether both handles wrap the very same test case.
    pub fn same_as(&self, other: &Chromosome<T>) -> bool {
        Arc::ptr_eq(&self.value, &other.value)
    }
}

impl<T> Clone for Chromosome<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
        }
    }
}

impl<T> std::ops::Deref for Chromosome<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_episode_tracks_states_and_discoveries() {
        let mut e = Episode::new(0, true);
        e.push(Action::click("a"), ExecutionOutcome::Success, Some((1, true)));
        e.push(Action::back(), ExecutionOutcome::Success, Some((0, false)));
        e.finish(EpisodeEnd::NoAction);

        assert_eq!(e.len(), 2);
        assert_eq!(e.states(), &[0, 1, 0]);
        assert_eq!(e.discovered_states(), 2);
        assert_eq!(e.distinct_states(), 2);
        assert_eq!(e.end(), EpisodeEnd::NoAction);
    }

    #[test]
    fn test_crash_without_observation() {
        let mut e = Episode::new(0, false);
        e.push(Action::click("boom"), ExecutionOutcome::FailureAppCrash, None);
        e.finish(EpisodeEnd::Crash);
        assert_eq!(e.states().len(), 1);
        assert!(e.crashed());
    }

    #[test]
    fn test_path_hash_depends_on_states() {
        let mut a = Episode::new(0, true);
        a.push(Action::click("x"), ExecutionOutcome::Success, Some((1, true)));
        let mut b = Episode::new(0, true);
        b.push(Action::click("y"), ExecutionOutcome::Success, Some((1, true)));
        let mut c = Episode::new(0, true);
        c.push(Action::click("x"), ExecutionOutcome::Success, Some((2, true)));
        assert_eq!(a.path_hash(), b.path_hash());
        assert_ne!(a.path_hash(), c.path_hash());
    }

    #[test]
    fn test_chromosome_clone_shares_value() {
        let c = Chromosome::new(Episode::new(3, false));
        let d = c.clone();
        assert!(c.same_as(&d));
        assert!(!c.same_as(&Chromosome::new(Episode::new(3, false))));
        assert_eq!(d.states(), &[3]);
    }

    #[test]
    fn test_end_from_outcome() {
        assert_eq!(
            EpisodeEnd::from_outcome(ExecutionOutcome::FailureAppCrash),
            Some(EpisodeEnd::Crash)
        );
        assert_eq!(EpisodeEnd::from_outcome(ExecutionOutcome::SuccessOutbound), None);
    }
}
