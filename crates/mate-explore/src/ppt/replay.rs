use mate_model::graph::GuiModel;
use mate_model::observation::Action;

use super::tree::{Distribution, NodeId, Ppt, PptError};
use crate::search::chromosome::Episode;

/// One replayed step: the distribution in effect before the step and the
/// action actually chosen there.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayStep {
    pub node: NodeId,
    pub distribution: Distribution,
    pub chosen: Action,
}

/// Replays a finished episode node by node against a tree, creating nodes
/// for states visited for the first time.
pub struct PptReplay<'a> {
    tree: &'a mut Ppt,
    episode: &'a Episode,
    model: &'a GuiModel,
    step: usize,
}

impl<'a> PptReplay<'a> {
    pub(crate) fn new(tree: &'a mut Ppt, episode: &'a Episode, model: &'a GuiModel) -> Self {
        tree.reset_position();
        Self {
            tree,
            episode,
            model,
            step: 0,
        }
    }
}

impl Iterator for PptReplay<'_> {
    type Item = Result<ReplayStep, PptError>;

    fn next(&mut self) -> Option<Self::Item> {
        let chosen = self.episode.actions().get(self.step)?.clone();
        // Crashed episodes may lack the final state.
        let target_id = *self.episode.states().get(self.step + 1)?;
        self.step += 1;

        let Some(target) = self.model.state(target_id) else {
            return Some(Err(PptError::UnknownState(target_id)));
        };
        let node = self.tree.cursor();
        let distribution = self.tree.action_probabilities();
        self.tree.update_position(&chosen, target);
        Some(Ok(ReplayStep {
            node,
            distribution,
            chosen,
        }))
    }
}

impl Ppt {
    /// Replay `episode` from the root. Leaves the cursor at the episode's
    /// final node.
    pub fn replay<'a>(&'a mut self, episode: &'a Episode, model: &'a GuiModel) -> PptReplay<'a> {
        PptReplay::new(self, episode, model)
    }

    /// PIPE-style reinforcement: along the episode's path, move each
    /// node's probability of the chosen action towards 1 by
    /// `learning_rate`, scaling the others down so the node still sums to 1.
    /// Returns the number of steps reinforced.
    pub fn reinforce(
        &mut self,
        episode: &Episode,
        model: &GuiModel,
        learning_rate: f64,
    ) -> Result<usize, PptError> {
        let steps = self.replay(episode, model).collect::<Result<Vec<_>, _>>()?;
        let mut reinforced = 0;
        for step in steps {
            // A non-deterministic app may reach a child whose screen lacks
            // the chosen action.
            if !step.distribution.contains_key(&step.chosen) {
                continue;
            }
            let mut updated = self.probabilities_of(step.node)?;
            for (action, p) in updated.iter_mut() {
                if *action == step.chosen {
                    *p += learning_rate * (1.0 - *p);
                } else {
                    *p *= 1.0 - learning_rate;
                }
            }
            self.commit_probabilities(step.node, &updated)?;
            reinforced += 1;
        }
        Ok(reinforced)
    }
}
