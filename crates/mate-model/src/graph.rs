use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::equivalence::StateEquivalence;
use crate::observation::{Action, ScreenObservation};

pub type StateId = u32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown state: {0}")]
    UnknownState(StateId),
}

/// The deduplicated representative of one or more equivalent screens.
///
/// Cloning is cheap: the observation is shared. Identity is the id alone.
#[derive(Debug, Clone)]
pub struct LogicalState {
    id: StateId,
    observation: Arc<ScreenObservation>,
}

impl LogicalState {
    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn observation(&self) -> &ScreenObservation {
        &self.observation
    }

    pub fn actions(&self) -> &[Action] {
        &self.observation.actions
    }
}

impl PartialEq for LogicalState {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LogicalState {}

impl std::hash::Hash for LogicalState {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A directed edge `source --action--> target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Transition {
    pub source: StateId,
    pub target: StateId,
    pub action: Action,
}

/// State/transition graph of one exploration run.
///
/// Grows monotonically: states and transitions are never removed, and
/// state ids are handed out in strictly increasing order.
#[derive(Debug, Clone)]
pub struct GuiModel {
    equivalence: StateEquivalence,
    states: Vec<LogicalState>,
    transitions: BTreeSet<Transition>,
    /// Next unique state id.
    next_state_id: StateId,
    /// Whether the latest `get_or_create_state` created a state.
    last_was_new: bool,
}

impl GuiModel {
    pub fn new(equivalence: StateEquivalence) -> Self {
        Self {
            equivalence,
            states: Vec::new(),
            transitions: BTreeSet::new(),
            next_state_id: 0,
            last_was_new: false,
        }
    }

    pub fn equivalence(&self) -> StateEquivalence {
        self.equivalence
    }

    /// Return the known state equivalent to `observation`, or register a
    /// new one. Known states are scanned in creation order.
    pub fn get_or_create_state(&mut self, observation: ScreenObservation) -> LogicalState {
        let equivalence = self.equivalence;
        if let Some(existing) = self
            .states
            .iter()
            .find(|s| equivalence.equivalent(&s.observation, &observation))
            .cloned()
        {
            self.last_was_new = false;
            return existing;
        }

        let state = LogicalState {
            id: self.next_state_id,
            observation: Arc::new(observation),
        };
        self.next_state_id += 1;
        self.last_was_new = true;
        debug!(
            state = state.id,
            activity = %state.observation.activity,
            "Discovered new state"
        );
        self.states.push(state.clone());
        state
    }

    /// Insert `source --action--> target`. Both states must already exist.
    /// Returns whether the transition was new.
    pub fn record_transition(
        &mut self,
        source: StateId,
        target: StateId,
        action: Action,
    ) -> Result<bool, ModelError> {
        for id in [source, target] {
            if self.state(id).is_none() {
                return Err(ModelError::UnknownState(id));
            }
        }
        Ok(self.transitions.insert(Transition {
            source,
            target,
            action,
        }))
    }

    /// True iff the most recent `get_or_create_state` created a state.
    pub fn reached_new_state(&self) -> bool {
        self.last_was_new
    }

    pub fn state(&self, id: StateId) -> Option<&LogicalState> {
        // Ids are dense and assigned in push order.
        self.states.get(id as usize).filter(|s| s.id == id)
    }

    /// The state observed at the very first reset.
    pub fn root(&self) -> Option<&LogicalState> {
        self.states.first()
    }

    pub fn states(&self) -> &[LogicalState] {
        &self.states
    }

    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions.iter()
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    /// Transitions leaving `source`.
    pub fn outgoing(&self, source: StateId) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.source == source)
    }

    /// Whether `action` has ever been executed from `source`.
    pub fn has_executed(&self, source: StateId, action: &Action) -> bool {
        self.outgoing(source).any(|t| &t.action == action)
    }

    /// Distinct targets reachable from `source` in one step.
    pub fn successors(&self, source: StateId) -> BTreeSet<StateId> {
        self.outgoing(source).map(|t| t.target).collect()
    }
}

impl Default for GuiModel {
    fn default() -> Self {
        Self::new(StateEquivalence::default())
    }
}
