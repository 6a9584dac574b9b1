//! Action-selection strategies: the "brain" that picks the next action from
//! the current screen's candidates.

pub mod ppt;
pub mod qbe;
pub mod random;
pub mod stoat;

use mate_model::graph::{GuiModel, LogicalState};
use mate_model::observation::Action;

use crate::ppt::PptError;
use crate::qbe::{QMatrixError, SamplingError};
use crate::search::chromosome::Episode;

pub use ppt::PptSelector;
pub use qbe::{QLearning, QbeSelector};
pub use random::UniformRandomSelector;
pub use stoat::StoatSelector;

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("sampling failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Q-matrix error: {0}")]
    QMatrix(#[from] QMatrixError),

    #[error("prototype tree error: {0}")]
    Ppt(#[from] PptError),
}

/// What a selector may look at when choosing.
pub struct SelectionContext<'a> {
    /// The logical state the device is currently in.
    pub state: &'a LogicalState,
    /// Actions executed so far in this episode.
    pub history: &'a [Action],
    /// The run's GUI model.
    pub model: &'a GuiModel,
}

impl SelectionContext<'_> {
    /// Candidate actions of the current screen.
    pub fn actions(&self) -> &[Action] {
        self.state.actions()
    }
}

/// A pluggable action-selection policy.
pub trait ActionSelector {
    /// Pick the next action, or `None` to end the episode.
    fn select_action(&mut self, ctx: &SelectionContext<'_>) -> Result<Option<Action>, SelectionError>;

    /// Called once per episode with the state observed after reset.
    fn on_episode_start(&mut self, _initial: &LogicalState) {}

    /// Called after every executed action with the state it reached.
    fn on_transition(&mut self, _action: &Action, _target: &LogicalState) {}

    /// Feedback for a finished episode. Learning selectors use it to
    /// re-weight; the default ignores it.
    fn learn(&mut self, _episode: &Episode, _reward: f64, _model: &GuiModel) -> Result<(), SelectionError> {
        Ok(())
    }

    /// Name of this strategy (for tracing).
    fn name(&self) -> &str;
}

impl<S: ActionSelector + ?Sized> ActionSelector for Box<S> {
    fn select_action(&mut self, ctx: &SelectionContext<'_>) -> Result<Option<Action>, SelectionError> {
        (**self).select_action(ctx)
    }

    fn on_episode_start(&mut self, initial: &LogicalState) {
        (**self).on_episode_start(initial)
    }

    fn on_transition(&mut self, action: &Action, target: &LogicalState) {
        (**self).on_transition(action, target)
    }

    fn learn(&mut self, episode: &Episode, reward: f64, model: &GuiModel) -> Result<(), SelectionError> {
        (**self).learn(episode, reward, model)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
