use mate_model::observation::Action;
use rand_chacha::ChaCha8Rng;

use super::{ActionSelector, SelectionContext, SelectionError};
use crate::heuristic::HeuristicWeighting;
use crate::qbe::weighted_choice;

/// Oracle flagging actions likely to expand exploration.
pub type PromisingOracle = Box<dyn Fn(&Action) -> bool>;

/// Weighted random exploration with Stoat-style heuristic weights.
///
/// The unvisited-child bonus is 1 for an action never executed from the
/// current state (per the GUI model) and 0 otherwise.
pub struct StoatSelector {
    weighting: HeuristicWeighting,
    promising: Option<PromisingOracle>,
    rng: ChaCha8Rng,
}

impl StoatSelector {
    pub fn new(weighting: HeuristicWeighting, rng: ChaCha8Rng) -> Self {
        Self {
            weighting,
            promising: None,
            rng,
        }
    }

    pub fn with_oracle(mut self, oracle: PromisingOracle) -> Self {
        self.promising = Some(oracle);
        self
    }
}

impl ActionSelector for StoatSelector {
    fn select_action(&mut self, ctx: &SelectionContext<'_>) -> Result<Option<Action>, SelectionError> {
        if ctx.actions().is_empty() {
            return Ok(None);
        }
        let source = ctx.state.id();
        let promising = &self.promising;
        let distribution = self.weighting.probabilities(
            ctx.actions(),
            ctx.history,
            |a| usize::from(!ctx.model.has_executed(source, a)),
            |a| promising.as_ref().map(|oracle| oracle(a)).unwrap_or(false),
        );
        Ok(Some(weighted_choice(&distribution, &mut self.rng)?))
    }

    fn name(&self) -> &str {
        "stoat"
    }
}
