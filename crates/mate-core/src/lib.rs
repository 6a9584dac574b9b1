//! Run orchestration for GUI exploration: configuration, resource limits,
//! logging setup, analytics and parallel workers.

pub mod analytics;
pub mod config;
pub mod limits;
pub mod logging;
pub mod run;

pub use analytics::RunAnalytics;
pub use config::{ConfigError, ExplorationConfig, Objective, SearchConfig, SelectorConfig};
pub use limits::{ResourceChecker, ResourceLimits, StopReason};
pub use logging::{init_tracing, LoggingConfig};
pub use run::{run_exploration, run_workers, RunError, RunOutcome};
