use std::collections::BTreeSet;

use super::chromosome::{Chromosome, Episode};

/// A pure fitness function over chromosomes.
pub trait FitnessFunction<T> {
    fn evaluate(&self, chromosome: &Chromosome<T>) -> f64;

    /// Whether larger values are better.
    fn is_maximizing(&self) -> bool {
        true
    }

    fn name(&self) -> &str;
}

/// Number of distinct logical states visited.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistinctStates;

impl FitnessFunction<Episode> for DistinctStates {
    fn evaluate(&self, chromosome: &Chromosome<Episode>) -> f64 {
        chromosome.distinct_states() as f64
    }

    fn name(&self) -> &str {
        "distinct_states"
    }
}

/// Number of states the episode discovered for the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscoveredStates;

impl FitnessFunction<Episode> for DiscoveredStates {
    fn evaluate(&self, chromosome: &Chromosome<Episode>) -> f64 {
        chromosome.discovered_states() as f64
    }

    fn name(&self) -> &str {
        "discovered_states"
    }
}

/// Number of distinct actions executed.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistinctActions;

impl FitnessFunction<Episode> for DistinctActions {
    fn evaluate(&self, chromosome: &Chromosome<Episode>) -> f64 {
        chromosome.actions().iter().collect::<BTreeSet<_>>().len() as f64
    }

    fn name(&self) -> &str {
        "distinct_actions"
    }
}

/// 1 if the episode ended in a crash, 0 otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crashes;

impl FitnessFunction<Episode> for Crashes {
    fn evaluate(&self, chromosome: &Chromosome<Episode>) -> f64 {
        if chromosome.crashed() {
            1.0
        } else {
            0.0
        }
    }

    fn name(&self) -> &str {
        "crashes"
    }
}

/// Episode length; shorter is better.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpisodeLength;

impl FitnessFunction<Episode> for EpisodeLength {
    fn evaluate(&self, chromosome: &Chromosome<Episode>) -> f64 {
        chromosome.len() as f64
    }

    fn is_maximizing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "episode_length"
    }
}

/// Evaluate every function, in order.
pub fn evaluate_all<T>(chromosome: &Chromosome<T>, functions: &[Box<dyn FitnessFunction<T>>]) -> Vec<f64> {
    functions.iter().map(|f| f.evaluate(chromosome)).collect()
}

/// `a` is strictly better than `b` under `f`.
pub fn is_better(a: f64, b: f64, maximizing: bool) -> bool {
    if maximizing {
        a > b
    } else {
        a < b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::ExecutionOutcome;
    use crate::search::chromosome::EpisodeEnd;
    use mate_model::observation::Action;

    fn episode() -> Chromosome<Episode> {
        let mut e = Episode::new(0, true);
        e.push(Action::click("a"), ExecutionOutcome::Success, Some((1, true)));
        e.push(Action::click("a"), ExecutionOutcome::Success, Some((1, false)));
        e.push(Action::back(), ExecutionOutcome::FailureAppCrash, Some((2, true)));
        e.finish(EpisodeEnd::Crash);
        Chromosome::new(e)
    }

    #[test]
    fn test_episode_fitness_values() {
        let c = episode();
        assert_eq!(DistinctStates.evaluate(&c), 3.0);
        assert_eq!(DiscoveredStates.evaluate(&c), 3.0);
        assert_eq!(DistinctActions.evaluate(&c), 2.0);
        assert_eq!(Crashes.evaluate(&c), 1.0);
        assert_eq!(EpisodeLength.evaluate(&c), 3.0);
        assert!(!EpisodeLength.is_maximizing());
    }

    #[test]
    fn test_evaluate_all_keeps_order() {
        let functions: Vec<Box<dyn FitnessFunction<Episode>>> =
            vec![Box::new(Crashes), Box::new(EpisodeLength)];
        assert_eq!(evaluate_all(&episode(), &functions), vec![1.0, 3.0]);
    }

    #[test]
    fn test_is_better_respects_direction() {
        assert!(is_better(2.0, 1.0, true));
        assert!(is_better(1.0, 2.0, false));
        assert!(!is_better(1.0, 1.0, true));
    }
}
