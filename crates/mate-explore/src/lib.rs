pub mod context;
pub mod device;
pub mod driver;
pub mod heuristic;
pub mod ppt;
pub mod qbe;
pub mod rng;
pub mod search;
pub mod signal;
pub mod simulated;
pub mod strategy;

pub use context::{DriverError, EpisodeSettings, ExplorationContext, ExplorationStats};
pub use device::{Device, DeviceError, ExecutionOutcome};
pub use driver::{DriverReport, ExplorationDriver};
pub use search::{Chromosome, Episode, EpisodeFactory, Evaluator, SearchAlgorithm};
pub use strategy::{ActionSelector, SelectionContext, SelectionError};
