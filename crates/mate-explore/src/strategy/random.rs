use mate_model::observation::Action;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::{ActionSelector, SelectionContext, SelectionError};

/// Uniform random exploration: every candidate action is equally likely.
pub struct UniformRandomSelector {
    rng: ChaCha8Rng,
}

impl UniformRandomSelector {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }
}

impl ActionSelector for UniformRandomSelector {
    fn select_action(&mut self, ctx: &SelectionContext<'_>) -> Result<Option<Action>, SelectionError> {
        Ok(ctx.actions().choose(&mut self.rng).cloned())
    }

    fn name(&self) -> &str {
        "uniform_random"
    }
}
