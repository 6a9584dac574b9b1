use std::collections::BTreeMap;

use mate_model::graph::LogicalState;
use mate_model::observation::Action;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::heuristic::HeuristicWeighting;

pub type NodeId = u32;

/// Action -> selection probability at one node.
pub type Distribution = BTreeMap<Action, f64>;

const SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PptError {
    #[error("unknown tree node: {0}")]
    UnknownNode(NodeId),

    #[error("unknown state {0} while replaying episode")]
    UnknownState(u32),

    #[error("committed distribution must cover exactly the node's actions")]
    ActionSetMismatch,

    #[error("probability must be finite and in [0, 1], got {0}")]
    InvalidProbability(f64),

    #[error("probabilities must sum to 1, got {0}")]
    NotNormalized(f64),
}

/// How a node's distribution is initialised on first read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InitialDistribution {
    #[default]
    Uniform,
    Heuristic(HeuristicWeighting),
}

/// One node: a visited state and the live distribution over its actions.
#[derive(Debug, Clone)]
pub struct PptNode {
    state: LogicalState,
    probabilities: Distribution,
    initialised: bool,
    children: BTreeMap<Action, NodeId>,
    parent: Option<NodeId>,
}

impl PptNode {
    fn new(state: LogicalState, parent: Option<NodeId>) -> Self {
        Self {
            state,
            probabilities: Distribution::new(),
            initialised: false,
            children: BTreeMap::new(),
            parent,
        }
    }

    pub fn state(&self) -> &LogicalState {
        &self.state
    }

    /// The distribution, if it has been initialised.
    pub fn probabilities(&self) -> Option<&Distribution> {
        self.initialised.then_some(&self.probabilities)
    }

    pub fn child(&self, action: &Action) -> Option<NodeId> {
        self.children.get(action).copied()
    }

    pub fn children(&self) -> impl Iterator<Item = (&Action, NodeId)> {
        self.children.iter().map(|(a, &id)| (a, id))
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }
}

/// Probabilistic prototype tree rooted at the initial state.
///
/// A cursor tracks the node matching the current position in an episode.
/// Children are keyed by the action taken; the state first reached through
/// an action defines the child. An action that leaves the state unchanged
/// does not descend.
///
/// Distributions are read as snapshots (`action_probabilities`) and written
/// back as a whole (`commit_probabilities`), so a reader never observes a
/// half-updated distribution.
#[derive(Debug, Clone)]
pub struct Ppt {
    nodes: Vec<PptNode>,
    cursor: NodeId,
    initial: InitialDistribution,
    /// Actions taken since the last `reset_position`.
    trail: Vec<Action>,
}

impl Ppt {
    pub fn new(root: LogicalState, initial: InitialDistribution) -> Self {
        Self {
            nodes: vec![PptNode::new(root, None)],
            cursor: 0,
            initial,
            trail: Vec::new(),
        }
    }

    pub fn root(&self) -> &PptNode {
        &self.nodes[0]
    }

    pub fn node(&self, id: NodeId) -> Option<&PptNode> {
        self.nodes.get(id as usize)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    pub fn current(&self) -> &PptNode {
        &self.nodes[self.cursor as usize]
    }

    /// Move the cursor back to the root.
    pub fn reset_position(&mut self) {
        self.cursor = 0;
        self.trail.clear();
    }

    /// Snapshot of the current node's distribution, initialising it on
    /// first read.
    pub fn action_probabilities(&mut self) -> Distribution {
        let cursor = self.cursor;
        self.ensure_initialised(cursor);
        self.nodes[cursor as usize].probabilities.clone()
    }

    /// Snapshot of any node's distribution, initialising it on first read.
    pub fn probabilities_of(&mut self, id: NodeId) -> Result<Distribution, PptError> {
        if self.node(id).is_none() {
            return Err(PptError::UnknownNode(id));
        }
        self.ensure_initialised(id);
        Ok(self.nodes[id as usize].probabilities.clone())
    }

    /// Write back an updated distribution for `id`.
    ///
    /// It must cover exactly the node's actions, with finite probabilities
    /// in `[0, 1]` summing to 1. Values are replaced in place.
    pub fn commit_probabilities(&mut self, id: NodeId, updated: &Distribution) -> Result<(), PptError> {
        if self.node(id).is_none() {
            return Err(PptError::UnknownNode(id));
        }
        self.ensure_initialised(id);

        let node = &mut self.nodes[id as usize];
        if updated.len() != node.probabilities.len()
            || !updated.keys().all(|a| node.probabilities.contains_key(a))
        {
            return Err(PptError::ActionSetMismatch);
        }
        for &p in updated.values() {
            if !p.is_finite() || !(0.0..=1.0).contains(&p) {
                return Err(PptError::InvalidProbability(p));
            }
        }
        let sum: f64 = updated.values().sum();
        if !updated.is_empty() && (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(PptError::NotNormalized(sum));
        }

        for (action, p) in node.probabilities.iter_mut() {
            if let Some(&new) = updated.get(action) {
                *p = new;
            }
        }
        Ok(())
    }

    /// Advance the cursor along `action` to the node for `next_state`,
    /// creating the child on first visit. Distributions are left untouched.
    pub fn update_position(&mut self, action: &Action, next_state: &LogicalState) -> NodeId {
        self.trail.push(action.clone());
        let current = self.cursor as usize;
        if self.nodes[current].state.id() == next_state.id() {
            return self.cursor;
        }
        if let Some(child) = self.nodes[current].child(action) {
            self.cursor = child;
            return child;
        }

        let id = self.nodes.len() as NodeId;
        self.nodes.push(PptNode::new(next_state.clone(), Some(self.cursor)));
        self.nodes[current].children.insert(action.clone(), id);
        self.cursor = id;
        id
    }

    /// Randomly shift probability mass of initialised nodes:
    /// each action is, with `probability`, moved towards 1 by `rate`, then
    /// the node is renormalised. Returns the number of nodes changed.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        probability: f64,
        rate: f64,
        rng: &mut R,
    ) -> Result<usize, PptError> {
        let mut changed = 0;
        for id in 0..self.nodes.len() as NodeId {
            let Some(mut distribution) = self.nodes[id as usize].probabilities().cloned() else {
                continue;
            };
            if distribution.is_empty() {
                continue;
            }
            let mut touched = false;
            for p in distribution.values_mut() {
                if rng.gen::<f64>() < probability {
                    *p += rate * (1.0 - *p);
                    touched = true;
                }
            }
            if !touched {
                continue;
            }
            let sum: f64 = distribution.values().sum();
            for p in distribution.values_mut() {
                *p /= sum;
            }
            self.commit_probabilities(id, &distribution)?;
            changed += 1;
        }
        Ok(changed)
    }

    fn ensure_initialised(&mut self, id: NodeId) {
        let idx = id as usize;
        if self.nodes[idx].initialised {
            return;
        }
        let actions = self.nodes[idx].state.actions();
        let distribution = match &self.initial {
            InitialDistribution::Uniform => uniform(actions),
            InitialDistribution::Heuristic(weighting) => {
                // History only applies to the cursor's path.
                let history: &[Action] = if id == self.cursor { &self.trail } else { &[] };
                weighting.probabilities(actions, history, |_| 0, |_| false)
            }
        };
        let node = &mut self.nodes[idx];
        node.probabilities = distribution;
        node.initialised = true;
    }
}

fn uniform(actions: &[Action]) -> Distribution {
    let mut distribution = Distribution::new();
    for action in actions {
        distribution.insert(action.clone(), 0.0);
    }
    let p = 1.0 / distribution.len().max(1) as f64;
    for value in distribution.values_mut() {
        *value = p;
    }
    distribution
}

#[cfg(test)]
mod tests {
    use super::*;
    use mate_model::graph::GuiModel;
    use mate_model::observation::ScreenObservation;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn states() -> (LogicalState, LogicalState) {
        let mut model = GuiModel::default();
        let a = model.get_or_create_state(
            ScreenObservation::new("pkg", "A").with_actions([Action::click("x"), Action::back()]),
        );
        let b = model.get_or_create_state(
            ScreenObservation::new("pkg", "B").with_actions([Action::menu()]),
        );
        (a, b)
    }

    #[test]
    fn test_lazy_uniform_initialisation() {
        let (a, _) = states();
        let mut tree = Ppt::new(a, InitialDistribution::Uniform);
        assert!(tree.root().probabilities().is_none());
        let d = tree.action_probabilities();
        assert_eq!(d.len(), 2);
        assert!(d.values().all(|&p| (p - 0.5).abs() < 1e-12));
        assert!(tree.root().probabilities().is_some());
    }

    #[test]
    fn test_commit_validates_distribution() {
        let (a, _) = states();
        let mut tree = Ppt::new(a, InitialDistribution::Uniform);
        let mut d = tree.action_probabilities();

        d.insert(Action::click("x"), 0.9);
        assert!(matches!(tree.commit_probabilities(0, &d), Err(PptError::NotNormalized(_))));

        d.insert(Action::back(), 0.1);
        assert!(tree.commit_probabilities(0, &d).is_ok());
        assert_eq!(tree.action_probabilities()[&Action::click("x")], 0.9);

        let mut extra = d.clone();
        extra.insert(Action::menu(), 0.0);
        assert_eq!(tree.commit_probabilities(0, &extra), Err(PptError::ActionSetMismatch));
        assert_eq!(tree.commit_probabilities(9, &d), Err(PptError::UnknownNode(9)));
    }

    #[test]
    fn test_update_position_creates_and_reuses_children() {
        let (a, b) = states();
        let mut tree = Ppt::new(a.clone(), InitialDistribution::Uniform);

        let child = tree.update_position(&Action::click("x"), &b);
        assert_eq!(child, 1);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.node(1).unwrap().parent(), Some(0));

        tree.reset_position();
        assert_eq!(tree.cursor(), 0);
        assert_eq!(tree.update_position(&Action::click("x"), &b), 1);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_self_loop_does_not_descend() {
        let (a, _) = states();
        let mut tree = Ppt::new(a.clone(), InitialDistribution::Uniform);
        assert_eq!(tree.update_position(&Action::back(), &a), 0);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_heuristic_initialisation_prefers_menu() {
        let mut model = GuiModel::default();
        let s = model.get_or_create_state(
            ScreenObservation::new("pkg", "A")
                .with_actions([Action::menu(), Action::new(mate_model::ActionKind::DpadUp)]),
        );
        let mut tree = Ppt::new(s, InitialDistribution::Heuristic(HeuristicWeighting::default()));
        let d = tree.action_probabilities();
        assert!(d[&Action::menu()] > d[&Action::new(mate_model::ActionKind::DpadUp)]);
        assert!((d.values().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mutate_keeps_distributions_normalised() {
        let (a, _) = states();
        let mut tree = Ppt::new(a, InitialDistribution::Uniform);
        tree.action_probabilities();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let changed = tree.mutate(1.0, 0.5, &mut rng).unwrap();
        assert_eq!(changed, 1);
        let d = tree.action_probabilities();
        assert!((d.values().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
