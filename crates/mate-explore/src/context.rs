use mate_model::graph::{GuiModel, LogicalState, ModelError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::device::{Device, DeviceError, ExecutionOutcome};
use crate::signal::{SignalEvent, SignalType};
use crate::strategy::SelectionError;

/// Errors that abort an exploration run.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("action selection failed: {0}")]
    Selection(#[from] SelectionError),

    #[error("reset failed after {attempts} attempts: {last}")]
    ResetFailed { attempts: u32, last: DeviceError },
}

/// Episode-loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeSettings {
    /// Maximum number of actions per episode.
    pub max_length: usize,
    /// Additional reset attempts before an episode start is given up.
    pub reset_retries: u32,
}

impl Default for EpisodeSettings {
    fn default() -> Self {
        Self {
            max_length: 50,
            reset_retries: 2,
        }
    }
}

/// Counters over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExplorationStats {
    pub episodes: u64,
    pub steps: u64,
    pub crashes: u64,
    pub executor_errors: u64,
    pub unknown_failures: u64,
    pub outbound: u64,
    pub reset_failures: u64,
}

impl ExplorationStats {
    pub fn record_outcome(&mut self, outcome: ExecutionOutcome) {
        self.steps += 1;
        match outcome {
            ExecutionOutcome::FailureAppCrash => self.crashes += 1,
            ExecutionOutcome::FailureExecutorError => self.executor_errors += 1,
            ExecutionOutcome::FailureUnknown => self.unknown_failures += 1,
            ExecutionOutcome::SuccessOutbound => self.outbound += 1,
            ExecutionOutcome::Success | ExecutionOutcome::SuccessNewState => {}
        }
    }
}

/// Everything one exploration worker owns: the device, the GUI model,
/// settings, counters and the signal log.
///
/// Passed explicitly through the episode loop and search algorithms.
/// Workers running in parallel each own an independent context.
pub struct ExplorationContext<D: Device> {
    pub device: D,
    pub model: GuiModel,
    pub settings: EpisodeSettings,
    stats: ExplorationStats,
    signals: Vec<SignalEvent>,
}

impl<D: Device> ExplorationContext<D> {
    pub fn new(device: D, model: GuiModel, settings: EpisodeSettings) -> Self {
        Self {
            device,
            model,
            settings,
            stats: ExplorationStats::default(),
            signals: Vec::new(),
        }
    }

    pub fn stats(&self) -> &ExplorationStats {
        &self.stats
    }

    pub fn signals(&self) -> &[SignalEvent] {
        &self.signals
    }

    /// Drain the signal log.
    pub fn take_signals(&mut self) -> Vec<SignalEvent> {
        std::mem::take(&mut self.signals)
    }

    /// Reset the device, retrying up to `reset_retries` more times.
    pub fn reset_device(&mut self) -> Result<(), DriverError> {
        let attempts = self.settings.reset_retries + 1;
        let mut last = DeviceError::Disconnected;
        for attempt in 1..=attempts {
            match self.device.reset() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    self.stats.reset_failures += 1;
                    warn!(attempt, attempts, error = %e, "Reset failed");
                    last = e;
                }
            }
        }
        Err(DriverError::ResetFailed { attempts, last })
    }

    /// Observe the current screen and map it onto a logical state.
    /// Returns the state and whether it was discovered by this call.
    pub fn observe_state(&mut self) -> Result<(LogicalState, bool), DriverError> {
        let observation = self.device.observe()?;
        let state = self.model.get_or_create_state(observation);
        let is_new = self.model.reached_new_state();
        if is_new {
            self.emit(SignalType::NewState { state: state.id() });
        }
        Ok((state, is_new))
    }

    pub(crate) fn begin_episode(&mut self) -> u64 {
        let index = self.stats.episodes;
        self.stats.episodes += 1;
        index
    }

    pub(crate) fn record_outcome(&mut self, outcome: ExecutionOutcome) {
        self.stats.record_outcome(outcome);
    }

    pub(crate) fn emit(&mut self, signal_type: SignalType) {
        self.signals.push(SignalEvent {
            episode: self.stats.episodes.saturating_sub(1),
            step: self.stats.steps,
            signal_type,
        });
    }
}
