use std::collections::BTreeMap;

use mate_model::graph::{GuiModel, LogicalState};
use mate_model::observation::Action;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::{ActionSelector, SelectionContext, SelectionError};
use crate::qbe::{weighted_choice, ActionAbstraction, QMatrix, QMatrixError, StateAbstraction};
use crate::search::chromosome::Episode;

/// Q-learning parameters for online updates after each episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QLearning {
    pub alpha: f64,
    pub gamma: f64,
}

/// Q-matrix guided selection (QBE).
///
/// Concrete actions are grouped by abstract action index so that an
/// abstract action with many concrete instances is not favoured. An
/// abstract action is drawn by its Q-value in the current abstract state,
/// then one of its concrete actions uniformly.
pub struct QbeSelector {
    matrix: QMatrix,
    state_abstraction: Box<dyn StateAbstraction>,
    action_abstraction: ActionAbstraction,
    learning: Option<QLearning>,
    rng: ChaCha8Rng,
}

impl QbeSelector {
    /// Fails if the matrix shape differs from the abstraction ranges.
    pub fn new(
        matrix: QMatrix,
        state_abstraction: Box<dyn StateAbstraction>,
        action_abstraction: ActionAbstraction,
        rng: ChaCha8Rng,
    ) -> Result<Self, QMatrixError> {
        matrix.check_dimensions(state_abstraction.size(), action_abstraction.size())?;
        Ok(Self {
            matrix,
            state_abstraction,
            action_abstraction,
            learning: None,
            rng,
        })
    }

    /// Update the matrix from every finished episode. Without this the
    /// matrix is read-only.
    pub fn with_learning(mut self, learning: QLearning) -> Self {
        self.learning = Some(learning);
        self
    }

    pub fn matrix(&self) -> &QMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut QMatrix {
        &mut self.matrix
    }

    pub fn abstract_state(&self, state: &LogicalState) -> usize {
        self.state_abstraction.index(state)
    }

    pub fn abstract_action(&self, action: &Action) -> usize {
        self.action_abstraction.index(action)
    }

    pub fn choose_action(&mut self, state: &LogicalState) -> Result<Option<Action>, SelectionError> {
        let actions = state.actions();
        if actions.is_empty() {
            return Ok(None);
        }

        let mut groups: BTreeMap<usize, Vec<&Action>> = BTreeMap::new();
        for action in actions {
            groups
                .entry(self.action_abstraction.index(action))
                .or_default()
                .push(action);
        }

        let abstract_state = self.state_abstraction.index(state);
        let mut weights = BTreeMap::new();
        for &abstract_action in groups.keys() {
            weights.insert(abstract_action, self.matrix.get(abstract_state, abstract_action)?);
        }

        let picked = weighted_choice(&weights, &mut self.rng)?;
        Ok(groups
            .get(&picked)
            .and_then(|members| members.choose(&mut self.rng))
            .map(|a| (*a).clone()))
    }
}

impl ActionSelector for QbeSelector {
    fn select_action(&mut self, ctx: &SelectionContext<'_>) -> Result<Option<Action>, SelectionError> {
        self.choose_action(ctx.state)
    }

    /// One Q-learning step per transition; a step is rewarded with 1 when
    /// it reached a state not yet seen in the episode.
    fn learn(&mut self, episode: &Episode, _reward: f64, model: &GuiModel) -> Result<(), SelectionError> {
        let Some(QLearning { alpha, gamma }) = self.learning else {
            return Ok(());
        };
        let states = episode.states();
        for (i, action) in episode.actions().iter().enumerate() {
            let (Some(source), Some(target)) = (states.get(i), states.get(i + 1)) else {
                break;
            };
            let (Some(source), Some(target)) = (model.state(*source), model.state(*target)) else {
                continue;
            };
            let reward = if states[..=i].contains(&target.id()) { 0.0 } else { 1.0 };
            self.matrix.update(
                self.state_abstraction.index(source),
                self.action_abstraction.index(action),
                reward,
                self.state_abstraction.index(target),
                alpha,
                gamma,
            )?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "qbe"
    }
}
