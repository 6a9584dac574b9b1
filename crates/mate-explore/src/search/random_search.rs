use tracing::debug;

use super::chromosome::{Chromosome, Episode};
use super::factory::EpisodeFactory;
use super::fitness::is_better;
use super::termination::TerminationCondition;
use super::{Evaluator, SearchAlgorithm};
use crate::context::{DriverError, ExplorationContext};
use crate::device::Device;

/// Generates independent episodes and archives the best ones by primary
/// fitness.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    archive_size: usize,
}

impl RandomSearch {
    pub fn new(archive_size: usize) -> Self {
        Self {
            archive_size: archive_size.max(1),
        }
    }
}

impl Default for RandomSearch {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Insert into an archive sorted best first, keeping at most `size`
/// entries. Equal fitness keeps the older entry ahead.
pub(crate) fn archive_insert(
    archive: &mut Vec<(f64, Chromosome<Episode>)>,
    entry: (f64, Chromosome<Episode>),
    size: usize,
    maximizing: bool,
) {
    let position = archive
        .iter()
        .position(|(f, _)| is_better(entry.0, *f, maximizing))
        .unwrap_or(archive.len());
    if position < size {
        archive.insert(position, entry);
        archive.truncate(size);
    }
}

impl<D: Device> SearchAlgorithm<D> for RandomSearch {
    fn run(
        &mut self,
        factory: &mut EpisodeFactory,
        ctx: &mut ExplorationContext<D>,
        evaluator: &mut Evaluator,
        termination: &mut dyn TerminationCondition,
    ) -> Result<Vec<Chromosome<Episode>>, DriverError> {
        let maximizing = evaluator.primary_maximizing();
        let mut archive = Vec::new();
        while !evaluator.should_stop(ctx, termination) {
            let chromosome = evaluator.generate(factory, ctx, &[], termination)?;
            let fitness = evaluator.evaluate(factory, ctx, &chromosome)?;
            archive_insert(&mut archive, (fitness[0], chromosome), self.archive_size, maximizing);
            evaluator.complete_iteration(ctx);
        }
        debug!(
            iterations = evaluator.progress().iterations,
            archived = archive.len(),
            "Random search finished"
        );
        Ok(archive.into_iter().map(|(_, c)| c).collect())
    }

    fn name(&self) -> &str {
        "random_search"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_keeps_best_first() {
        let mut archive = Vec::new();
        for f in [1.0, 3.0, 2.0, 0.5] {
            archive_insert(&mut archive, (f, Chromosome::new(Episode::new(0, false))), 2, true);
        }
        let kept: Vec<f64> = archive.iter().map(|(f, _)| *f).collect();
        assert_eq!(kept, vec![3.0, 2.0]);
    }

    #[test]
    fn test_archive_minimizing() {
        let mut archive = Vec::new();
        for f in [4.0, 1.0, 1.0] {
            archive_insert(&mut archive, (f, Chromosome::new(Episode::new(0, false))), 3, false);
        }
        let kept: Vec<f64> = archive.iter().map(|(f, _)| *f).collect();
        assert_eq!(kept, vec![1.0, 1.0, 4.0]);
    }
}
