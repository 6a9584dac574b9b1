use serde::{Deserialize, Serialize};

use crate::context::ExplorationStats;

/// Progress of a running search. Termination is checked after every
/// completed device step and between algorithm iterations (one episode for
/// most algorithms, one generation for the genetic algorithm).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchProgress {
    /// Completed algorithm iterations.
    pub iterations: u64,
    /// Chromosomes evaluated so far.
    pub evaluations: u64,
    /// Best primary fitness seen so far.
    pub best_fitness: Option<f64>,
    pub steps: u64,
    /// Completed episodes.
    pub episodes: u64,
    pub crashes: u64,
}

impl SearchProgress {
    /// Refresh the device counters from a context's statistics.
    pub fn sync_stats(&mut self, stats: &ExplorationStats) {
        self.steps = stats.steps;
        self.episodes = stats.episodes;
        self.crashes = stats.crashes;
    }

    /// Refresh the counters while an episode is still running; that
    /// episode does not count as completed yet.
    pub fn sync_in_episode(&mut self, stats: &ExplorationStats) {
        self.sync_stats(stats);
        self.episodes = stats.episodes.saturating_sub(1);
    }

    /// Fold a newly evaluated fitness into the best value.
    pub fn observe_fitness(&mut self, fitness: f64, maximizing: bool) {
        self.evaluations += 1;
        let better = match self.best_fitness {
            None => true,
            Some(best) => super::fitness::is_better(fitness, best, maximizing),
        };
        if better {
            self.best_fitness = Some(fitness);
        }
    }
}

/// Decides when a search stops. Checked after each completed step; a step
/// in flight is never cancelled.
pub trait TerminationCondition {
    fn is_met(&mut self, progress: &SearchProgress) -> bool;

    fn name(&self) -> &str;
}

impl<T: TerminationCondition + ?Sized> TerminationCondition for Box<T> {
    fn is_met(&mut self, progress: &SearchProgress) -> bool {
        (**self).is_met(progress)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Stop after a fixed number of iterations.
#[derive(Debug, Clone, Copy)]
pub struct IterationLimit(pub u64);

impl TerminationCondition for IterationLimit {
    fn is_met(&mut self, progress: &SearchProgress) -> bool {
        progress.iterations >= self.0
    }

    fn name(&self) -> &str {
        "iteration_limit"
    }
}

/// Never stops on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct Never;

impl TerminationCondition for Never {
    fn is_met(&mut self, _progress: &SearchProgress) -> bool {
        false
    }

    fn name(&self) -> &str {
        "never"
    }
}

/// Stop once the best fitness reaches a target.
#[derive(Debug, Clone, Copy)]
pub struct FitnessTarget {
    pub target: f64,
    pub maximizing: bool,
}

impl TerminationCondition for FitnessTarget {
    fn is_met(&mut self, progress: &SearchProgress) -> bool {
        match progress.best_fitness {
            Some(best) if self.maximizing => best >= self.target,
            Some(best) => best <= self.target,
            None => false,
        }
    }

    fn name(&self) -> &str {
        "fitness_target"
    }
}

/// Met as soon as any inner condition is met. Remembers which one fired.
#[derive(Default)]
pub struct AnyOf {
    conditions: Vec<Box<dyn TerminationCondition>>,
    fired: Option<usize>,
}

impl AnyOf {
    pub fn new(conditions: Vec<Box<dyn TerminationCondition>>) -> Self {
        Self {
            conditions,
            fired: None,
        }
    }

    pub fn with(mut self, condition: impl TerminationCondition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    /// Name of the condition that fired, if any.
    pub fn fired(&self) -> Option<&str> {
        self.fired.map(|i| self.conditions[i].name())
    }
}

impl TerminationCondition for AnyOf {
    fn is_met(&mut self, progress: &SearchProgress) -> bool {
        // Every condition sees every check, so stateful ones stay in step.
        let mut fired = None;
        for (i, condition) in self.conditions.iter_mut().enumerate() {
            if condition.is_met(progress) && fired.is_none() {
                fired = Some(i);
            }
        }
        if fired.is_some() {
            self.fired = fired;
        }
        fired.is_some()
    }

    fn name(&self) -> &str {
        "any_of"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iteration_limit() {
        let mut limit = IterationLimit(3);
        let mut progress = SearchProgress::default();
        assert!(!limit.is_met(&progress));
        progress.iterations = 3;
        assert!(limit.is_met(&progress));
    }

    #[test]
    fn test_fitness_target_both_directions() {
        let progress = SearchProgress {
            best_fitness: Some(5.0),
            ..Default::default()
        };
        assert!(FitnessTarget { target: 5.0, maximizing: true }.is_met(&progress));
        assert!(!FitnessTarget { target: 4.0, maximizing: false }.is_met(&progress));
        assert!(!FitnessTarget { target: 0.0, maximizing: true }.is_met(&SearchProgress::default()));
    }

    #[test]
    fn test_any_of_reports_first_fired() {
        let mut any = AnyOf::default().with(Never).with(IterationLimit(2)).with(IterationLimit(1));
        let progress = SearchProgress {
            iterations: 2,
            ..Default::default()
        };
        assert!(any.is_met(&progress));
        assert_eq!(any.fired(), Some("iteration_limit"));
        assert!(!AnyOf::default().with(Never).is_met(&progress));
    }

    #[test]
    fn test_running_episode_is_not_counted() {
        let stats = ExplorationStats {
            episodes: 3,
            steps: 12,
            ..Default::default()
        };
        let mut progress = SearchProgress::default();
        progress.sync_in_episode(&stats);
        assert_eq!((progress.episodes, progress.steps), (2, 12));
        progress.sync_stats(&stats);
        assert_eq!(progress.episodes, 3);
    }

    #[test]
    fn test_observe_fitness_tracks_best() {
        let mut progress = SearchProgress::default();
        progress.observe_fitness(2.0, true);
        progress.observe_fitness(1.0, true);
        progress.observe_fitness(3.0, true);
        assert_eq!(progress.best_fitness, Some(3.0));
        assert_eq!(progress.evaluations, 3);
    }
}
