use mate_model::graph::{GuiModel, LogicalState};
use mate_model::observation::Action;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use super::{ActionSelector, SelectionContext, SelectionError};
use crate::ppt::{Distribution, InitialDistribution, Ppt};
use crate::qbe::weighted_choice;
use crate::search::chromosome::Episode;

/// Probability-tree guided selection (PIPE).
///
/// The tree is rooted at the first state this selector sees. Actions are
/// drawn from the cursor node's distribution, restricted to the actions the
/// current screen actually offers. After each episode, an episode scoring
/// at least as well as the best so far is reinforced into the tree, and
/// the tree is then optionally mutated.
pub struct PptSelector {
    tree: Option<Ppt>,
    initial: InitialDistribution,
    learning_rate: f64,
    /// (per-action probability, rate) of the post-learning mutation.
    mutation: Option<(f64, f64)>,
    best_reward: Option<f64>,
    rng: ChaCha8Rng,
}

impl PptSelector {
    pub fn new(initial: InitialDistribution, learning_rate: f64, rng: ChaCha8Rng) -> Self {
        Self {
            tree: None,
            initial,
            learning_rate,
            mutation: None,
            best_reward: None,
            rng,
        }
    }

    pub fn with_mutation(mut self, probability: f64, rate: f64) -> Self {
        self.mutation = Some((probability, rate));
        self
    }

    pub fn tree(&self) -> Option<&Ppt> {
        self.tree.as_ref()
    }

    fn tree_for(&mut self, state: &LogicalState) -> &mut Ppt {
        let initial = &self.initial;
        self.tree
            .get_or_insert_with(|| Ppt::new(state.clone(), initial.clone()))
    }
}

impl ActionSelector for PptSelector {
    fn on_episode_start(&mut self, initial: &LogicalState) {
        self.tree_for(initial).reset_position();
    }

    fn select_action(&mut self, ctx: &SelectionContext<'_>) -> Result<Option<Action>, SelectionError> {
        let available = ctx.actions();
        if available.is_empty() {
            return Ok(None);
        }
        let node_distribution = self.tree_for(ctx.state).action_probabilities();
        let distribution: Distribution = node_distribution
            .into_iter()
            .filter(|(a, _)| available.contains(a))
            .collect();
        if distribution.is_empty() {
            return Ok(available.choose(&mut self.rng).cloned());
        }
        Ok(Some(weighted_choice(&distribution, &mut self.rng)?))
    }

    fn on_transition(&mut self, action: &Action, target: &LogicalState) {
        if let Some(tree) = self.tree.as_mut() {
            tree.update_position(action, target);
        }
    }

    fn learn(&mut self, episode: &Episode, reward: f64, model: &GuiModel) -> Result<(), SelectionError> {
        if self.best_reward.is_some_and(|best| reward < best) {
            return Ok(());
        }
        self.best_reward = Some(reward);
        if let Some(tree) = self.tree.as_mut() {
            let steps = tree.reinforce(episode, model, self.learning_rate)?;
            debug!(reward, steps, nodes = tree.len(), "Reinforced prototype tree");
            if let Some((probability, rate)) = self.mutation {
                tree.mutate(probability, rate, &mut self.rng)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "pipe"
    }
}
