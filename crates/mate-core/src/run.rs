//! Run entry points: wire a configuration into selector, search algorithm
//! and driver, and run independent workers in parallel.

use mate_explore::context::{DriverError, ExplorationContext};
use mate_explore::device::Device;
use mate_explore::driver::{DriverReport, ExplorationDriver};
use mate_explore::qbe::{
    AbstractionError, ActionAbstraction, ActionCountAbstraction, ActivityAbstraction, QMatrix,
    QMatrixError, StateAbstraction, ABSTRACT_ACTIONS,
};
use mate_explore::rng::{component_rng, SEARCH_STREAM, SELECTOR_STREAM};
use mate_explore::search::fitness::{Crashes, DiscoveredStates, DistinctActions, DistinctStates, EpisodeLength};
use mate_explore::search::{
    Episode, EpisodeFactory, Evaluator, FitnessFunction, GeneticAlgorithm, GreyBoxFuzzer, OnePlusOne,
    RandomSearch,
};
use mate_explore::strategy::{
    ActionSelector, PptSelector, QLearning, QbeSelector, StoatSelector, UniformRandomSelector,
};
use mate_model::export::ModelSnapshot;
use mate_model::graph::GuiModel;
use rayon::prelude::*;
use tracing::{info, info_span};

use crate::analytics::RunAnalytics;
use crate::config::{ConfigError, ExplorationConfig, Objective, SearchConfig, SelectorConfig, StateAbstractionKind};
use crate::limits::{ResourceChecker, StopReason};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("abstraction error: {0}")]
    Abstraction(#[from] AbstractionError),

    #[error("Q-matrix error: {0}")]
    QMatrix(#[from] QMatrixError),

    #[error("exploration failed: {0}")]
    Driver(#[from] DriverError),
}

/// Everything one worker produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub worker: u64,
    pub report: DriverReport,
    pub analytics: RunAnalytics,
    pub model: ModelSnapshot,
    /// Which resource limit ended the run.
    pub stop_reason: Option<StopReason>,
}

impl Objective {
    pub fn build(self) -> Box<dyn FitnessFunction<Episode>> {
        match self {
            Objective::DistinctStates => Box::new(DistinctStates),
            Objective::DiscoveredStates => Box::new(DiscoveredStates),
            Objective::DistinctActions => Box::new(DistinctActions),
            Objective::Crashes => Box::new(Crashes),
            Objective::EpisodeLength => Box::new(EpisodeLength),
        }
    }
}

/// Build the configured selector with its own RNG stream.
pub fn build_selector(config: &ExplorationConfig, worker: u64) -> Result<Box<dyn ActionSelector>, RunError> {
    let rng = component_rng(config.seed, worker, SELECTOR_STREAM);
    let selector: Box<dyn ActionSelector> = match &config.selector {
        SelectorConfig::UniformRandom => Box::new(UniformRandomSelector::new(rng)),
        SelectorConfig::Stoat { weighting } => Box::new(StoatSelector::new(weighting.clone(), rng)),
        SelectorConfig::Qbe {
            state_abstraction,
            abstract_states,
            matrix,
            learning,
        } => {
            let abstraction: Box<dyn StateAbstraction> = match state_abstraction {
                StateAbstractionKind::ActionCount => Box::new(ActionCountAbstraction::new(*abstract_states)?),
                StateAbstractionKind::Activity => Box::new(ActivityAbstraction::new(*abstract_states)?),
            };
            let matrix = match matrix {
                Some(matrix) => matrix.clone(),
                None => QMatrix::zeros(*abstract_states, ABSTRACT_ACTIONS)?,
            };
            let mut selector = QbeSelector::new(matrix, abstraction, ActionAbstraction::standard()?, rng)?;
            if let Some((alpha, gamma)) = *learning {
                selector = selector.with_learning(QLearning { alpha, gamma });
            }
            Box::new(selector)
        }
        SelectorConfig::Pipe {
            initial,
            learning_rate,
            mutation,
        } => {
            let mut selector = PptSelector::new(initial.clone(), *learning_rate, rng);
            if let Some((probability, rate)) = *mutation {
                selector = selector.with_mutation(probability, rate);
            }
            Box::new(selector)
        }
    };
    Ok(selector)
}

/// Run one exploration against `device` as worker `worker`.
pub fn run_exploration<D: Device>(
    config: &ExplorationConfig,
    device: D,
    worker: u64,
) -> Result<RunOutcome, RunError> {
    config.validate()?;
    let span = info_span!("worker", worker);
    let _guard = span.enter();

    let ctx = ExplorationContext::new(device, GuiModel::new(config.equivalence), config.episode.clone());
    let factory = EpisodeFactory::new(build_selector(config, worker)?);
    let evaluator = Evaluator::new(config.objectives.iter().map(|o| o.build()).collect());
    let mut driver = ExplorationDriver::new(ctx, factory, evaluator);
    let mut checker = ResourceChecker::new(config.limits.clone());

    let search_rng = |offset: u64| component_rng(config.seed, worker, SEARCH_STREAM + offset);
    let report = match &config.search {
        SearchConfig::Episodes => driver.explore(&mut checker)?,
        SearchConfig::RandomSearch { archive_size } => {
            driver.search(&mut RandomSearch::new(*archive_size), &mut checker)?
        }
        SearchConfig::OnePlusOne => driver.search(&mut OnePlusOne::new(search_rng(0)), &mut checker)?,
        SearchConfig::Genetic {
            population_size,
            tournament_size,
        } => {
            let mut genetic =
                GeneticAlgorithm::new(*population_size, *tournament_size, search_rng(0), search_rng(1));
            driver.search(&mut genetic, &mut checker)?
        }
        SearchConfig::GreyBoxFuzzing { settings } => {
            driver.search(&mut GreyBoxFuzzer::new(settings.clone(), search_rng(0)), &mut checker)?
        }
    };

    let (mut ctx, _factory, evaluator) = driver.into_parts();
    let mut analytics = RunAnalytics::new();
    analytics.record_signals(&ctx.take_signals());
    analytics.record_episodes(evaluator.records());
    analytics.finish(ctx.stats(), &ctx.model, checker.elapsed_secs());

    info!(
        worker,
        stop_reason = ?checker.stop_reason(),
        states = analytics.total_states,
        transitions = analytics.total_transitions,
        crashes = analytics.crashes,
        "Worker finished"
    );
    Ok(RunOutcome {
        worker,
        report,
        analytics,
        model: ctx.model.snapshot(),
        stop_reason: checker.stop_reason(),
    })
}

/// Run `workers` fully independent explorations in parallel. Each worker
/// owns its device, model, selector state and RNG streams; results come
/// back in worker order.
pub fn run_workers<D, F>(
    config: &ExplorationConfig,
    workers: u64,
    make_device: F,
) -> Vec<Result<RunOutcome, RunError>>
where
    D: Device,
    F: Fn(u64) -> D + Sync + Send,
{
    (0..workers)
        .into_par_iter()
        .map(|worker| run_exploration(config, make_device(worker), worker))
        .collect()
}
