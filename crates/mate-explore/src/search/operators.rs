use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::chromosome::{Chromosome, Episode};
use super::factory::EpisodeFactory;
use super::population::{rank_crowding_cmp, Evaluated};
use super::termination::TerminationCondition;
use super::Evaluator;
use crate::context::{DriverError, ExplorationContext};
use crate::device::Device;

/// Draw `size` members uniformly (with replacement) and return the best
/// under rank-crowding order. `None` for an empty population.
pub fn tournament<'a, T, R: Rng + ?Sized>(
    members: &'a [Evaluated<T>],
    size: usize,
    rng: &mut R,
) -> Option<&'a Evaluated<T>> {
    if members.is_empty() {
        return None;
    }
    let mut best = &members[rng.gen_range(0..members.len())];
    for _ in 1..size.max(1) {
        let candidate = &members[rng.gen_range(0..members.len())];
        if rank_crowding_cmp(candidate, best).is_lt() {
            best = candidate;
        }
    }
    Some(best)
}

/// Keeps a random-length prefix of the parent's actions and regenerates the
/// tail with the factory's selector.
pub struct CutPointMutation {
    rng: ChaCha8Rng,
}

impl CutPointMutation {
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }

    /// Cut point in `0..=len`; 0 regenerates the whole episode.
    pub fn cut_point(&mut self, parent: &Episode) -> usize {
        self.rng.gen_range(0..=parent.len())
    }

    /// Run the mutated episode; `termination` is checked after each step.
    pub fn mutate<D: Device>(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        evaluator: &mut Evaluator,
        termination: &mut dyn TerminationCondition,
        parent: &Chromosome<Episode>,
    ) -> Result<Chromosome<Episode>, DriverError> {
        let cut = self.cut_point(parent);
        evaluator.generate(factory, ctx, &parent.actions()[..cut], termination)
    }
}
