use std::collections::BTreeMap;

use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::chromosome::{Chromosome, Episode};
use super::factory::EpisodeFactory;
use super::operators::CutPointMutation;
use super::termination::TerminationCondition;
use super::{Evaluator, SearchAlgorithm};
use crate::context::{DriverError, ExplorationContext};
use crate::device::Device;

/// Power schedule settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuzzingSettings {
    /// Fresh episodes forming the initial corpus.
    pub initial_seeds: usize,
    /// Energy of a seed on its first selection with a unique path.
    pub base_energy: u32,
    /// Upper bound on mutants per seed selection.
    pub max_energy: u32,
}

impl Default for FuzzingSettings {
    fn default() -> Self {
        Self {
            initial_seeds: 5,
            base_energy: 1,
            max_energy: 16,
        }
    }
}

struct Seed {
    chromosome: Chromosome<Episode>,
    times_chosen: u32,
}

/// Grey-box fuzzing over episodes: pick a seed from the corpus, assign it
/// energy, mutate it that many times; mutants that discover new states join
/// the corpus, crashing mutants go to the crash archive.
///
/// Energy follows an exponential schedule: it doubles every time a seed is
/// chosen and is divided by how often the seed's state path has been
/// exercised, so rarely-seen paths get more mutants.
pub struct GreyBoxFuzzer {
    settings: FuzzingSettings,
    mutation: CutPointMutation,
    corpus: Vec<Seed>,
    crashes: Vec<Chromosome<Episode>>,
    path_frequency: BTreeMap<u64, u64>,
    next_seed: usize,
}

impl GreyBoxFuzzer {
    pub fn new(settings: FuzzingSettings, rng: ChaCha8Rng) -> Self {
        Self {
            settings,
            mutation: CutPointMutation::new(rng),
            corpus: Vec::new(),
            crashes: Vec::new(),
            path_frequency: BTreeMap::new(),
            next_seed: 0,
        }
    }

    pub fn corpus(&self) -> impl Iterator<Item = &Chromosome<Episode>> {
        self.corpus.iter().map(|s| &s.chromosome)
    }

    pub fn crashes(&self) -> &[Chromosome<Episode>] {
        &self.crashes
    }

    pub fn is_interesting(chromosome: &Chromosome<Episode>) -> bool {
        chromosome.discovered_states() > 0
    }

    pub fn is_crashing(chromosome: &Chromosome<Episode>) -> bool {
        chromosome.crashed()
    }

    fn record_path(&mut self, chromosome: &Chromosome<Episode>) {
        *self.path_frequency.entry(chromosome.path_hash()).or_insert(0) += 1;
    }

    /// Index of the next seed, round-robin over the corpus.
    fn choose_seed(&mut self) -> Option<usize> {
        if self.corpus.is_empty() {
            return None;
        }
        let index = self.next_seed % self.corpus.len();
        self.next_seed = self.next_seed.wrapping_add(1);
        Some(index)
    }

    fn assign_energy(&self, seed: &Seed) -> u32 {
        let frequency = self
            .path_frequency
            .get(&seed.chromosome.path_hash())
            .copied()
            .unwrap_or(1)
            .max(1);
        let doubled = u64::from(self.settings.base_energy) << seed.times_chosen.min(31);
        let energy = (doubled / frequency).clamp(1, u64::from(self.settings.max_energy.max(1)));
        energy as u32
    }

    /// Sort a new chromosome into the crash archive, the corpus, or neither.
    fn triage(&mut self, chromosome: Chromosome<Episode>) {
        self.record_path(&chromosome);
        if Self::is_crashing(&chromosome) {
            debug!(length = chromosome.len(), "Crash archived");
            self.crashes.push(chromosome);
        } else if Self::is_interesting(&chromosome) {
            self.corpus.push(Seed {
                chromosome,
                times_chosen: 0,
            });
        }
    }
}

impl<D: Device> SearchAlgorithm<D> for GreyBoxFuzzer {
    fn run(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        evaluator: &mut Evaluator,
        termination: &mut dyn TerminationCondition,
    ) -> Result<Vec<Chromosome<Episode>>, DriverError> {
        for _ in 0..self.settings.initial_seeds.max(1) {
            if evaluator.should_stop(ctx, termination) {
                break;
            }
            let chromosome = evaluator.generate(factory, ctx, &[], termination)?;
            evaluator.evaluate(factory, ctx, &chromosome)?;
            self.record_path(&chromosome);
            if Self::is_crashing(&chromosome) {
                self.crashes.push(chromosome.clone());
            }
            // Initial seeds are kept even when they found nothing.
            self.corpus.push(Seed {
                chromosome,
                times_chosen: 0,
            });
        }
        evaluator.complete_iteration(ctx);

        'outer: while !evaluator.should_stop(ctx, termination) {
            let Some(index) = self.choose_seed() else {
                break;
            };
            let energy = self.assign_energy(&self.corpus[index]);
            self.corpus[index].times_chosen += 1;
            let seed = self.corpus[index].chromosome.clone();

            for _ in 0..energy {
                let mutant = self
                    .mutation
                    .mutate(factory, ctx, evaluator, termination, &seed)?;
                evaluator.evaluate(factory, ctx, &mutant)?;
                self.triage(mutant);
                if evaluator.should_stop(ctx, termination) {
                    evaluator.complete_iteration(ctx);
                    break 'outer;
                }
            }
            evaluator.complete_iteration(ctx);
        }

        info!(
            corpus = self.corpus.len(),
            crashes = self.crashes.len(),
            paths = self.path_frequency.len(),
            "Fuzzing finished"
        );
        Ok(self.corpus().cloned().collect())
    }

    fn name(&self) -> &str {
        "grey_box_fuzzing"
    }
}
