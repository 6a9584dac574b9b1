//! Exploration as search: chromosomes wrapping episodes, fitness,
//! population ranking, termination, operators and the algorithms built on
//! them.

pub mod chromosome;
pub mod factory;
pub mod fitness;
pub mod fuzzing;
pub mod genetic;
pub mod operators;
pub mod population;
pub mod random_search;
pub mod termination;

use mate_model::observation::Action;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::{DriverError, ExplorationContext};
use crate::device::Device;

pub use chromosome::{Chromosome, Episode, EpisodeEnd};
pub use factory::{EpisodeFactory, StepCheck, StopPredicate};
pub use fitness::FitnessFunction;
pub use fuzzing::GreyBoxFuzzer;
pub use genetic::{GeneticAlgorithm, OnePlusOne};
pub use operators::CutPointMutation;
pub use random_search::RandomSearch;
pub use termination::{SearchProgress, TerminationCondition};

/// Per-episode record for downstream statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: u64,
    pub length: usize,
    pub end: EpisodeEnd,
    pub discovered: usize,
    /// Model size after the episode.
    pub total_states: usize,
    /// Device steps after the episode.
    pub total_steps: u64,
    pub fitness: Vec<f64>,
}

/// Evaluates every generated chromosome: computes its fitness vector,
/// feeds the primary fitness back to the selector as reward, tracks
/// progress and keeps crashing episodes.
pub struct Evaluator {
    objectives: Vec<Box<dyn FitnessFunction<Episode>>>,
    progress: SearchProgress,
    records: Vec<EpisodeRecord>,
    crashes: Vec<Chromosome<Episode>>,
}

impl Evaluator {
    /// The first objective is the primary one. An empty list falls back to
    /// discovered states.
    pub fn new(mut objectives: Vec<Box<dyn FitnessFunction<Episode>>>) -> Self {
        if objectives.is_empty() {
            objectives.push(Box::new(fitness::DiscoveredStates));
        }
        Self {
            objectives,
            progress: SearchProgress::default(),
            records: Vec::new(),
            crashes: Vec::new(),
        }
    }

    pub fn objectives(&self) -> &[Box<dyn FitnessFunction<Episode>>] {
        &self.objectives
    }

    pub fn maximizing(&self) -> Vec<bool> {
        self.objectives.iter().map(|f| f.is_maximizing()).collect()
    }

    pub fn primary_maximizing(&self) -> bool {
        self.objectives[0].is_maximizing()
    }

    pub fn progress(&self) -> &SearchProgress {
        &self.progress
    }

    pub fn records(&self) -> &[EpisodeRecord] {
        &self.records
    }

    pub fn crashes(&self) -> &[Chromosome<Episode>] {
        &self.crashes
    }

    /// Run one episode that replays `prefix`, checking `termination` after
    /// every step so limits hold mid-episode.
    pub fn generate<D: Device>(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        prefix: &[Action],
        termination: &mut dyn TerminationCondition,
    ) -> Result<Chromosome<Episode>, DriverError> {
        let progress = &mut self.progress;
        factory.run_episode(ctx, prefix, &mut |stats| {
            progress.sync_in_episode(stats);
            termination.is_met(progress)
        })
    }

    pub fn evaluate<D: Device>(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &ExplorationContext<D>,
        chromosome: &Chromosome<Episode>,
    ) -> Result<Vec<f64>, DriverError> {
        let fitness = fitness::evaluate_all(chromosome, &self.objectives);
        let primary = fitness[0];
        factory
            .selector_mut()
            .learn(chromosome.value(), primary, &ctx.model)?;

        self.progress.observe_fitness(primary, self.primary_maximizing());
        self.progress.sync_stats(ctx.stats());
        if chromosome.crashed() {
            self.crashes.push(chromosome.clone());
        }
        self.records.push(EpisodeRecord {
            episode: ctx.stats().episodes.saturating_sub(1),
            length: chromosome.len(),
            end: chromosome.end(),
            discovered: chromosome.discovered_states(),
            total_states: ctx.model.state_count(),
            total_steps: ctx.stats().steps,
            fitness: fitness.clone(),
        });
        trace!(fitness = ?fitness, "Evaluated chromosome");
        Ok(fitness)
    }

    /// Mark one algorithm iteration complete.
    pub fn complete_iteration<D: Device>(&mut self, ctx: &ExplorationContext<D>) {
        self.progress.iterations += 1;
        self.progress.sync_stats(ctx.stats());
    }

    /// Check `termination` against the current progress.
    pub fn should_stop<D: Device>(
        &mut self,
        ctx: &ExplorationContext<D>,
        termination: &mut dyn TerminationCondition,
    ) -> bool {
        self.progress.sync_stats(ctx.stats());
        termination.is_met(&self.progress)
    }
}

/// A search algorithm over episodes. Runs until `termination` is met and
/// returns its archive of best chromosomes.
pub trait SearchAlgorithm<D: Device> {
    fn run(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        evaluator: &mut Evaluator,
        termination: &mut dyn TerminationCondition,
    ) -> Result<Vec<Chromosome<Episode>>, DriverError>;

    fn name(&self) -> &str;
}
