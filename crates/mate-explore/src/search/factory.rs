use std::collections::VecDeque;

use mate_model::observation::Action;
use tracing::{debug, warn};

use super::chromosome::{Chromosome, Episode, EpisodeEnd};
use crate::context::{DriverError, ExplorationContext, ExplorationStats};
use crate::device::{Device, ExecutionOutcome};
use crate::signal::SignalType;
use crate::strategy::{ActionSelector, SelectionContext};

/// Predicate deciding whether an episode should stop early.
pub type StopPredicate = Box<dyn Fn(&Episode) -> bool>;

/// Consulted after every completed step with the run's counters; `true`
/// ends the episode as [`EpisodeEnd::Terminated`].
pub type StepCheck<'a> = dyn FnMut(&ExplorationStats) -> bool + 'a;

/// Builds chromosomes by running episodes against the device.
///
/// Composed of a pluggable action selector and an optional stop predicate;
/// variants are built by injecting different parts.
pub struct EpisodeFactory {
    selector: Box<dyn ActionSelector>,
    stop: Option<StopPredicate>,
}

impl EpisodeFactory {
    pub fn new(selector: Box<dyn ActionSelector>) -> Self {
        Self {
            selector,
            stop: None,
        }
    }

    pub fn with_stop(mut self, stop: StopPredicate) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn selector(&self) -> &dyn ActionSelector {
        self.selector.as_ref()
    }

    pub fn selector_mut(&mut self) -> &mut dyn ActionSelector {
        self.selector.as_mut()
    }

    /// Run one fresh episode.
    pub fn create_chromosome<D: Device>(
        &mut self,
        ctx: &mut ExplorationContext<D>,
    ) -> Result<Chromosome<Episode>, DriverError> {
        self.create_from_prefix(ctx, &[])
    }

    /// Run one episode that first replays `prefix`, then continues with the
    /// selector. Prefix actions the current screen no longer offers are
    /// skipped.
    pub fn create_from_prefix<D: Device>(
        &mut self,
        ctx: &mut ExplorationContext<D>,
        prefix: &[Action],
    ) -> Result<Chromosome<Episode>, DriverError> {
        self.run_episode(ctx, prefix, &mut |_| false)
    }

    /// [`create_from_prefix`](Self::create_from_prefix) with `check` run
    /// once per completed observe/execute/record step.
    pub fn run_episode<D: Device>(
        &mut self,
        ctx: &mut ExplorationContext<D>,
        prefix: &[Action],
        check: &mut StepCheck<'_>,
    ) -> Result<Chromosome<Episode>, DriverError> {
        ctx.reset_device()?;
        let episode_index = ctx.begin_episode();
        let (mut current, is_new) = ctx.observe_state()?;
        self.selector.on_episode_start(&current);

        let mut episode = Episode::new(current.id(), is_new);
        let mut pending: VecDeque<&Action> = prefix.iter().collect();
        let max_length = ctx.settings.max_length;

        let end = loop {
            if episode.len() >= max_length {
                break EpisodeEnd::MaxLength;
            }
            if self.stop.as_ref().is_some_and(|stop| stop(&episode)) {
                break EpisodeEnd::Stopped;
            }

            let mut replayed = None;
            while let Some(next) = pending.pop_front() {
                if current.actions().contains(next) {
                    replayed = Some(next.clone());
                    break;
                }
            }
            let action = match replayed {
                Some(action) => action,
                None => {
                    let selection = SelectionContext {
                        state: &current,
                        history: episode.actions(),
                        model: &ctx.model,
                    };
                    match self.selector.select_action(&selection)? {
                        Some(action) => action,
                        None => break EpisodeEnd::NoAction,
                    }
                }
            };

            let outcome = ctx.device.execute(&action);
            ctx.record_outcome(outcome);
            match outcome {
                ExecutionOutcome::FailureAppCrash => ctx.emit(SignalType::Crash {
                    action: action.clone(),
                    state: current.id(),
                }),
                ExecutionOutcome::FailureExecutorError | ExecutionOutcome::FailureUnknown => {
                    ctx.emit(SignalType::ExecutorFailure {
                        action: action.clone(),
                        outcome,
                    })
                }
                ExecutionOutcome::SuccessOutbound => ctx.emit(SignalType::Outbound {
                    action: action.clone(),
                }),
                ExecutionOutcome::Success | ExecutionOutcome::SuccessNewState => {}
            }

            let terminal = EpisodeEnd::from_outcome(outcome);
            let observed = match ctx.observe_state() {
                Ok(observed) => Some(observed),
                // The screen after a failure may be unobservable; the
                // episode ends either way.
                Err(e) if terminal.is_some() => {
                    warn!(episode = episode_index, error = %e, "Could not observe screen after failure");
                    None
                }
                Err(e) => return Err(e),
            };

            match observed {
                Some((next, next_is_new)) => {
                    if ctx
                        .model
                        .record_transition(current.id(), next.id(), action.clone())?
                    {
                        ctx.emit(SignalType::NewTransition {
                            source: current.id(),
                            target: next.id(),
                            action: action.clone(),
                        });
                    }
                    self.selector.on_transition(&action, &next);
                    episode.push(action, outcome, Some((next.id(), next_is_new)));
                    current = next;
                }
                None => episode.push(action, outcome, None),
            }

            if let Some(end) = terminal {
                break end;
            }
            if check(ctx.stats()) {
                break EpisodeEnd::Terminated;
            }
        };

        episode.finish(end);
        debug!(
            episode = episode_index,
            selector = self.selector.name(),
            length = episode.len(),
            discovered = episode.discovered_states(),
            end = ?end,
            "Episode finished"
        );
        Ok(Chromosome::new(episode))
    }
}
