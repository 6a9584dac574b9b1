use serde::{Deserialize, Serialize};
use tracing::info;

use crate::context::{DriverError, ExplorationContext};
use crate::device::Device;
use crate::search::random_search::archive_insert;
use crate::search::{
    Chromosome, Episode, EpisodeFactory, Evaluator, SearchAlgorithm, SearchProgress,
    TerminationCondition,
};

/// Summary of one driver run.
#[derive(Debug, Clone)]
pub struct DriverReport {
    /// Best chromosomes, as chosen by the algorithm.
    pub archive: Vec<Chromosome<Episode>>,
    /// Episodes that ended in a crash.
    pub crashes: Vec<Chromosome<Episode>>,
    pub progress: SearchProgress,
    /// Name of the termination condition that ended the run.
    pub stopped_by: String,
}

/// Lightweight, serializable view of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub archived: usize,
    pub crashes: usize,
    pub progress: SearchProgress,
    pub stopped_by: String,
}

impl DriverReport {
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            archived: self.archive.len(),
            crashes: self.crashes.len(),
            progress: self.progress.clone(),
            stopped_by: self.stopped_by.clone(),
        }
    }
}

/// The outer exploration loop: resets, runs episodes (directly, or through a
/// search algorithm) and stops when the termination condition fires.
///
/// Single-threaded; each step completes before the next begins.
pub struct ExplorationDriver<D: Device> {
    ctx: ExplorationContext<D>,
    factory: EpisodeFactory,
    evaluator: Evaluator,
}

impl<D: Device> ExplorationDriver<D> {
    pub fn new(ctx: ExplorationContext<D>, factory: EpisodeFactory, evaluator: Evaluator) -> Self {
        Self {
            ctx,
            factory,
            evaluator,
        }
    }

    pub fn context(&self) -> &ExplorationContext<D> {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExplorationContext<D> {
        &mut self.ctx
    }

    pub fn factory(&self) -> &EpisodeFactory {
        &self.factory
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn into_parts(self) -> (ExplorationContext<D>, EpisodeFactory, Evaluator) {
        (self.ctx, self.factory, self.evaluator)
    }

    /// Run fresh episodes with the factory's selector until `termination`
    /// is met. Keeps the single best episode.
    pub fn explore(
        &mut self,
        termination: &mut dyn TerminationCondition,
    ) -> Result<DriverReport, DriverError> {
        info!(
            selector = self.factory.selector().name(),
            "Starting exploration"
        );
        let maximizing = self.evaluator.primary_maximizing();
        let mut best = Vec::new();
        while !self.evaluator.should_stop(&self.ctx, termination) {
            let chromosome =
                self.evaluator
                    .generate(&mut self.factory, &mut self.ctx, &[], termination)?;
            let fitness = self
                .evaluator
                .evaluate(&mut self.factory, &self.ctx, &chromosome)?;
            archive_insert(&mut best, (fitness[0], chromosome), 1, maximizing);
            self.evaluator.complete_iteration(&self.ctx);
        }
        Ok(self.report(best.into_iter().map(|(_, c)| c).collect(), termination))
    }

    /// Run a search algorithm until `termination` is met.
    pub fn search(
        &mut self,
        algorithm: &mut dyn SearchAlgorithm<D>,
        termination: &mut dyn TerminationCondition,
    ) -> Result<DriverReport, DriverError> {
        info!(
            algorithm = algorithm.name(),
            selector = self.factory.selector().name(),
            "Starting search"
        );
        let archive = algorithm.run(
            &mut self.factory,
            &mut self.ctx,
            &mut self.evaluator,
            termination,
        )?;
        Ok(self.report(archive, termination))
    }

    fn report(
        &self,
        archive: Vec<Chromosome<Episode>>,
        termination: &dyn TerminationCondition,
    ) -> DriverReport {
        let progress = self.evaluator.progress().clone();
        info!(
            stopped_by = termination.name(),
            episodes = progress.episodes,
            steps = progress.steps,
            states = self.ctx.model.state_count(),
            transitions = self.ctx.model.transition_count(),
            crashes = progress.crashes,
            "Exploration finished"
        );
        DriverReport {
            archive,
            crashes: self.evaluator.crashes().to_vec(),
            progress,
            stopped_by: termination.name().to_string(),
        }
    }
}
