//! Stoat-style initial action weights.
//!
//! Raw weight of an action:
//!
//! ```text
//! (event_weight(kind) + unvisited_children) / (gamma * (executions_in_history + 1))
//! ```
//!
//! Probabilities normalize raw weights, with a fixed probability mass `p`
//! split off for actions an external oracle flags as promising and `1 - p`
//! for the rest. Inside each group actions share the mass proportionally to
//! their raw weight. If one group is empty the other receives all the mass.

use std::collections::BTreeMap;

use mate_model::observation::{Action, ActionKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WeightingError {
    #[error("gamma must be finite and > 0, got {0}")]
    InvalidGamma(f64),

    #[error("promising mass must lie in [0, 1], got {0}")]
    InvalidPromisingMass(f64),

    #[error("event weight for {kind} must be finite and >= 0, got {weight}")]
    InvalidEventWeight { kind: ActionKind, weight: f64 },
}

/// Base weight per action kind.
///
/// Every kind has an entry; kinds never set explicitly fall back to the
/// default table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventWeights {
    weights: BTreeMap<ActionKind, f64>,
}

impl EventWeights {
    pub fn default_weight(kind: ActionKind) -> f64 {
        match kind {
            ActionKind::Menu => 2.0,
            ActionKind::Click | ActionKind::TypeText => 1.0,
            ActionKind::LongClick => 0.8,
            ActionKind::SwipeUp
            | ActionKind::SwipeDown
            | ActionKind::SwipeLeft
            | ActionKind::SwipeRight => 0.6,
            ActionKind::Back | ActionKind::Enter | ActionKind::ClearText | ActionKind::Intent => 0.5,
            ActionKind::DpadUp
            | ActionKind::DpadDown
            | ActionKind::DpadLeft
            | ActionKind::DpadRight
            | ActionKind::DpadCenter => 0.25,
            ActionKind::Restart => 0.1,
        }
    }

    pub fn new() -> Self {
        Self {
            weights: ActionKind::ALL
                .iter()
                .map(|&k| (k, Self::default_weight(k)))
                .collect(),
        }
    }

    pub fn get(&self, kind: ActionKind) -> f64 {
        self.weights
            .get(&kind)
            .copied()
            .unwrap_or_else(|| Self::default_weight(kind))
    }

    pub fn set(&mut self, kind: ActionKind, weight: f64) -> Result<(), WeightingError> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(WeightingError::InvalidEventWeight { kind, weight });
        }
        self.weights.insert(kind, weight);
        Ok(())
    }
}

impl Default for EventWeights {
    fn default() -> Self {
        Self::new()
    }
}

/// Parameters of the heuristic weighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicWeighting {
    pub event_weights: EventWeights,
    /// Execution-frequency penalty factor.
    pub gamma: f64,
    /// Aggregate probability mass assigned to promising actions.
    pub promising_mass: f64,
}

impl Default for HeuristicWeighting {
    fn default() -> Self {
        Self {
            event_weights: EventWeights::default(),
            gamma: 1.0,
            promising_mass: 0.6,
        }
    }
}

impl HeuristicWeighting {
    pub fn new(gamma: f64, promising_mass: f64) -> Result<Self, WeightingError> {
        let weighting = Self {
            gamma,
            promising_mass,
            ..Self::default()
        };
        weighting.validate()?;
        Ok(weighting)
    }

    pub fn validate(&self) -> Result<(), WeightingError> {
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(WeightingError::InvalidGamma(self.gamma));
        }
        if !(0.0..=1.0).contains(&self.promising_mass) {
            return Err(WeightingError::InvalidPromisingMass(self.promising_mass));
        }
        for (&kind, &weight) in &self.event_weights.weights {
            if !weight.is_finite() || weight < 0.0 {
                return Err(WeightingError::InvalidEventWeight { kind, weight });
            }
        }
        Ok(())
    }

    /// Raw (unnormalized) weight of `action` given the actions executed so
    /// far and the number of its unvisited children (0 when not tracked).
    pub fn weight(&self, action: &Action, history: &[Action], unvisited_children: usize) -> f64 {
        let executions = history.iter().filter(|a| *a == action).count();
        let base = self.event_weights.get(action.kind) + unvisited_children as f64;
        base / (self.gamma * (executions + 1) as f64)
    }

    /// Probability distribution over the distinct `actions`.
    pub fn probabilities<U, P>(
        &self,
        actions: &[Action],
        history: &[Action],
        unvisited_children: U,
        is_promising: P,
    ) -> BTreeMap<Action, f64>
    where
        U: Fn(&Action) -> usize,
        P: Fn(&Action) -> bool,
    {
        let mut promising = BTreeMap::new();
        let mut regular = BTreeMap::new();
        for action in actions {
            if promising.contains_key(action) || regular.contains_key(action) {
                continue;
            }
            let w = self.weight(action, history, unvisited_children(action));
            if is_promising(action) {
                promising.insert(action.clone(), w);
            } else {
                regular.insert(action.clone(), w);
            }
        }

        let (promising_mass, regular_mass) = match (promising.is_empty(), regular.is_empty()) {
            (true, _) => (0.0, 1.0),
            (false, true) => (1.0, 0.0),
            (false, false) => (self.promising_mass, 1.0 - self.promising_mass),
        };

        let mut distribution = BTreeMap::new();
        share_mass(promising, promising_mass, &mut distribution);
        share_mass(regular, regular_mass, &mut distribution);
        distribution
    }
}

/// Spread `mass` over a group proportionally to raw weight (uniformly if
/// every weight in the group is zero).
fn share_mass(group: BTreeMap<Action, f64>, mass: f64, out: &mut BTreeMap<Action, f64>) {
    if group.is_empty() {
        return;
    }
    let total: f64 = group.values().sum();
    let count = group.len() as f64;
    for (action, w) in group {
        let p = if total > 0.0 {
            mass * w / total
        } else {
            mass / count
        };
        out.insert(action, p);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(d: &BTreeMap<Action, f64>) -> f64 {
        d.values().sum()
    }

    #[test]
    fn test_menu_outweighs_dpad() {
        let h = HeuristicWeighting::default();
        let menu = h.weight(&Action::menu(), &[], 0);
        let dpad = h.weight(&Action::new(ActionKind::DpadDown), &[], 0);
        assert!(menu > dpad);
    }

    #[test]
    fn test_execution_frequency_penalty() {
        let h = HeuristicWeighting::new(2.0, 0.6).unwrap();
        let click = Action::click("ok");
        let fresh = h.weight(&click, &[], 0);
        let twice = h.weight(&click, &[click.clone(), click.clone()], 0);
        assert!((fresh - 1.0 / 2.0).abs() < 1e-12);
        assert!((twice - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_unvisited_child_bonus() {
        let h = HeuristicWeighting::default();
        let click = Action::click("ok");
        assert!((h.weight(&click, &[], 3) - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_promising_mass_split() {
        let h = HeuristicWeighting::new(1.0, 0.6).unwrap();
        let actions = vec![Action::click("a"), Action::click("b"), Action::back()];
        let d = h.probabilities(&actions, &[], |_| 0, |a| a.kind == ActionKind::Back);

        assert!((total(&d) - 1.0).abs() < 1e-12);
        assert!((d[&Action::back()] - 0.6).abs() < 1e-12);
        assert!((d[&Action::click("a")] - 0.2).abs() < 1e-12);
        assert!((d[&Action::click("b")] - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_mass_proportional_within_group() {
        let h = HeuristicWeighting::new(1.0, 0.5).unwrap();
        // menu 2.0 and click 1.0 share the non-promising half.
        let actions = vec![Action::menu(), Action::click("a"), Action::back()];
        let d = h.probabilities(&actions, &[], |_| 0, |a| a.kind == ActionKind::Back);
        assert!((d[&Action::menu()] - 0.5 * 2.0 / 3.0).abs() < 1e-12);
        assert!((d[&Action::click("a")] - 0.5 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_promising_actions_gets_full_mass() {
        let h = HeuristicWeighting::default();
        let actions = vec![Action::click("a"), Action::click("b")];
        let d = h.probabilities(&actions, &[], |_| 0, |_| false);
        assert!((total(&d) - 1.0).abs() < 1e-12);
        assert!((d[&Action::click("a")] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_actions_counted_once() {
        let h = HeuristicWeighting::default();
        let actions = vec![Action::click("a"), Action::click("a")];
        let d = h.probabilities(&actions, &[], |_| 0, |_| false);
        assert_eq!(d.len(), 1);
        assert!((d[&Action::click("a")] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert_eq!(
            HeuristicWeighting::new(0.0, 0.6),
            Err(WeightingError::InvalidGamma(0.0))
        );
        assert_eq!(
            HeuristicWeighting::new(1.0, 1.2),
            Err(WeightingError::InvalidPromisingMass(1.2))
        );
        let mut weights = EventWeights::new();
        assert!(weights.set(ActionKind::Menu, -1.0).is_err());
        assert!(weights.set(ActionKind::Menu, 3.0).is_ok());
        assert_eq!(weights.get(ActionKind::Menu), 3.0);
    }
}
