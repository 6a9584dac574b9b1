//! Resource limits for one exploration run.
//!
//! When a limit is hit the run stops between steps and reports what it
//! has so far, rather than failing.

use std::time::Instant;

use mate_explore::search::{SearchProgress, TerminationCondition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum wall-clock seconds before forced stop.
    pub max_wall_secs: u64,
    /// Maximum executed actions across all episodes.
    pub max_steps: u64,
    pub max_episodes: u64,
    /// Maximum algorithm iterations (episodes, or generations for the
    /// genetic algorithm).
    pub max_iterations: u64,
    /// Maximum crashes before stopping (the app is too broken to continue).
    pub max_crashes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_wall_secs: 300,
            max_steps: 10_000,
            max_episodes: 200,
            max_iterations: 1_000,
            max_crashes: 100,
        }
    }
}

/// Reason a run was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    WallTimeExceeded,
    StepLimitReached,
    EpisodeLimitReached,
    IterationLimitReached,
    CrashLimitReached,
}

/// Checks progress against [`ResourceLimits`]; usable directly as a
/// search termination condition.
#[derive(Debug, Clone)]
pub struct ResourceChecker {
    limits: ResourceLimits,
    start_time: Instant,
    reason: Option<StopReason>,
}

impl ResourceChecker {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            start_time: Instant::now(),
            reason: None,
        }
    }

    /// First exceeded limit, if any.
    pub fn check(&self, progress: &SearchProgress) -> Option<StopReason> {
        if self.start_time.elapsed().as_secs() >= self.limits.max_wall_secs {
            return Some(StopReason::WallTimeExceeded);
        }
        if progress.steps >= self.limits.max_steps {
            return Some(StopReason::StepLimitReached);
        }
        if progress.episodes >= self.limits.max_episodes {
            return Some(StopReason::EpisodeLimitReached);
        }
        if progress.iterations >= self.limits.max_iterations {
            return Some(StopReason::IterationLimitReached);
        }
        if progress.crashes >= self.limits.max_crashes {
            return Some(StopReason::CrashLimitReached);
        }
        None
    }

    /// The reason recorded by the last check that fired.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.reason
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64()
    }

    pub fn limits(&self) -> &ResourceLimits {
        &self.limits
    }
}

impl TerminationCondition for ResourceChecker {
    fn is_met(&mut self, progress: &SearchProgress) -> bool {
        match self.check(progress) {
            Some(reason) => {
                self.reason = Some(reason);
                true
            }
            None => false,
        }
    }

    fn name(&self) -> &str {
        "resource_limits"
    }
}
