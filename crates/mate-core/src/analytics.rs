//! Run analytics for downstream statistics.
//!
//! Tracks the state-discovery curve, per-episode records and failure
//! counts of one exploration run.

use mate_explore::context::ExplorationStats;
use mate_explore::search::{EpisodeEnd, EpisodeRecord};
use mate_explore::signal::{SignalEvent, SignalType};
use mate_model::graph::GuiModel;
use serde::{Deserialize, Serialize};

/// Model size at the step a new state was discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPoint {
    pub step: u64,
    pub states: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunAnalytics {
    pub discovery_curve: Vec<DiscoveryPoint>,
    pub episodes: Vec<EpisodeRecord>,
    pub total_steps: u64,
    pub total_episodes: u64,
    pub total_states: usize,
    pub total_transitions: usize,
    pub crashes: u64,
    /// Executor errors plus unknown failures.
    pub executor_failures: u64,
    pub outbound: u64,
    pub elapsed_secs: f64,
}

impl RunAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extend the discovery curve from a signal log.
    pub fn record_signals(&mut self, signals: &[SignalEvent]) {
        let mut states = self.discovery_curve.last().map_or(0, |p| p.states);
        for event in signals {
            if let SignalType::NewState { .. } = event.signal_type {
                states += 1;
                self.discovery_curve.push(DiscoveryPoint {
                    step: event.step,
                    states,
                });
            }
        }
    }

    pub fn record_episodes(&mut self, records: &[EpisodeRecord]) {
        self.episodes.extend_from_slice(records);
    }

    /// Take final totals from the run's statistics and model.
    pub fn finish(&mut self, stats: &ExplorationStats, model: &GuiModel, elapsed_secs: f64) {
        self.total_steps = stats.steps;
        self.total_episodes = stats.episodes;
        self.total_states = model.state_count();
        self.total_transitions = model.transition_count();
        self.crashes = stats.crashes;
        self.executor_failures = stats.executor_errors + stats.unknown_failures;
        self.outbound = stats.outbound;
        self.elapsed_secs = elapsed_secs;
    }

    /// New states per 1000 steps.
    pub fn discovery_rate_per_k_steps(&self) -> f64 {
        if self.total_steps == 0 {
            0.0
        } else {
            self.total_states as f64 / self.total_steps as f64 * 1000.0
        }
    }

    /// Steps at which half of the final states had been found.
    pub fn half_discovery_step(&self) -> Option<u64> {
        let half = self.total_states.div_ceil(2);
        self.discovery_curve
            .iter()
            .find(|p| p.states >= half)
            .map(|p| p.step)
    }

    pub fn mean_episode_length(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        let total: usize = self.episodes.iter().map(|e| e.length).sum();
        total as f64 / self.episodes.len() as f64
    }

    /// Fraction of episodes that ended in a crash.
    pub fn crash_rate(&self) -> f64 {
        if self.episodes.is_empty() {
            return 0.0;
        }
        let crashed = self
            .episodes
            .iter()
            .filter(|e| e.end == EpisodeEnd::Crash)
            .count();
        crashed as f64 / self.episodes.len() as f64
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
