use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::chromosome::{Chromosome, Episode};
use super::factory::EpisodeFactory;
use super::fitness::is_better;
use super::operators::{tournament, CutPointMutation};
use super::population::{assign_rank_and_crowding, select_survivors, Evaluated};
use super::termination::TerminationCondition;
use super::{Evaluator, SearchAlgorithm};
use crate::context::{DriverError, ExplorationContext};
use crate::device::Device;

/// (1+1) evolution: mutate a single parent and keep the child whenever it
/// is not worse under the primary fitness.
pub struct OnePlusOne {
    mutation: CutPointMutation,
}

impl OnePlusOne {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self {
            mutation: CutPointMutation::new(rng),
        }
    }
}

impl<D: Device> SearchAlgorithm<D> for OnePlusOne {
    fn run(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        evaluator: &mut Evaluator,
        termination: &mut dyn TerminationCondition,
    ) -> Result<Vec<Chromosome<Episode>>, DriverError> {
        let maximizing = evaluator.primary_maximizing();
        if evaluator.should_stop(ctx, termination) {
            return Ok(Vec::new());
        }
        let mut parent = evaluator.generate(factory, ctx, &[], termination)?;
        let mut parent_fitness = evaluator.evaluate(factory, ctx, &parent)?[0];
        evaluator.complete_iteration(ctx);

        while !evaluator.should_stop(ctx, termination) {
            let child = self
                .mutation
                .mutate(factory, ctx, evaluator, termination, &parent)?;
            let child_fitness = evaluator.evaluate(factory, ctx, &child)?[0];
            if !is_better(parent_fitness, child_fitness, maximizing) {
                debug!(from = parent_fitness, to = child_fitness, "Child replaces parent");
                parent = child;
                parent_fitness = child_fitness;
            }
            evaluator.complete_iteration(ctx);
        }
        Ok(vec![parent])
    }

    fn name(&self) -> &str {
        "one_plus_one"
    }
}

/// Multi-objective genetic algorithm in the NSGA-II style: tournament
/// selection, cut-point mutation and survival by non-dominated rank, then
/// crowding distance. One iteration is one generation.
pub struct GeneticAlgorithm {
    population_size: usize,
    tournament_size: usize,
    mutation: CutPointMutation,
    rng: ChaCha8Rng,
}

impl GeneticAlgorithm {
    pub fn new(
        population_size: usize,
        tournament_size: usize,
        mutation_rng: ChaCha8Rng,
        selection_rng: ChaCha8Rng,
    ) -> Self {
        Self {
            population_size: population_size.max(1),
            tournament_size: tournament_size.max(1),
            mutation: CutPointMutation::new(mutation_rng),
            rng: selection_rng,
        }
    }

    fn evaluated<D: Device>(
        factory: &mut EpisodeFactory,
        ctx: &ExplorationContext<D>,
        evaluator: &mut Evaluator,
        chromosome: Chromosome<Episode>,
    ) -> Result<Evaluated<Episode>, DriverError> {
        let fitness = evaluator.evaluate(factory, ctx, &chromosome)?;
        Ok(Evaluated {
            chromosome,
            fitness,
            rank: 0,
            crowding: 0.0,
        })
    }
}

impl<D: Device> SearchAlgorithm<D> for GeneticAlgorithm {
    fn run(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        evaluator: &mut Evaluator,
        termination: &mut dyn TerminationCondition,
    ) -> Result<Vec<Chromosome<Episode>>, DriverError> {
        let maximizing = evaluator.maximizing();
        let mut population = Vec::with_capacity(self.population_size);
        let mut stopped = false;
        for _ in 0..self.population_size {
            if evaluator.should_stop(ctx, termination) {
                stopped = true;
                break;
            }
            let chromosome = evaluator.generate(factory, ctx, &[], termination)?;
            population.push(Self::evaluated(factory, ctx, evaluator, chromosome)?);
        }
        assign_rank_and_crowding(&mut population, &maximizing);
        if !stopped {
            evaluator.complete_iteration(ctx);
        }

        while !stopped && !evaluator.should_stop(ctx, termination) {
            let mut offspring = Vec::with_capacity(self.population_size);
            for _ in 0..self.population_size {
                if evaluator.should_stop(ctx, termination) {
                    stopped = true;
                    break;
                }
                let Some(parent) = tournament(&population, self.tournament_size, &mut self.rng) else {
                    break;
                };
                let parent = parent.chromosome.clone();
                let child = self
                    .mutation
                    .mutate(factory, ctx, evaluator, termination, &parent)?;
                offspring.push(Self::evaluated(factory, ctx, evaluator, child)?);
            }
            population.extend(offspring);
            population = select_survivors(population, self.population_size, &maximizing);
            if stopped {
                debug!(size = population.len(), "Generation cut short");
                break;
            }
            evaluator.complete_iteration(ctx);
            debug!(
                generation = evaluator.progress().iterations,
                front = population.iter().filter(|m| m.rank == 0).count(),
                "Generation complete"
            );
        }
        info!(
            generations = evaluator.progress().iterations,
            evaluations = evaluator.progress().evaluations,
            "Genetic search finished"
        );
        Ok(population
            .into_iter()
            .filter(|m| m.rank == 0)
            .map(|m| m.chromosome)
            .collect())
    }

    fn name(&self) -> &str {
        "genetic"
    }
}
