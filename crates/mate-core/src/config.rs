//! Exploration run configuration, loadable from JSON.

use std::path::Path;

use mate_explore::context::EpisodeSettings;
use mate_explore::heuristic::{HeuristicWeighting, WeightingError};
use mate_explore::ppt::InitialDistribution;
use mate_explore::qbe::{QMatrix, QMatrixError, ABSTRACT_ACTIONS};
use mate_explore::search::fuzzing::FuzzingSettings;
use mate_model::equivalence::{EquivalenceError, StateEquivalence};
use serde::{Deserialize, Serialize};

use crate::limits::ResourceLimits;
use crate::logging::LoggingConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid state equivalence: {0}")]
    Equivalence(#[from] EquivalenceError),

    #[error("invalid heuristic weighting: {0}")]
    Weighting(#[from] WeightingError),

    #[error("invalid Q-matrix: {0}")]
    QMatrix(#[from] QMatrixError),

    #[error("{field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

/// How QBE abstracts logical states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateAbstractionKind {
    /// Number of enabled actions, saturating.
    #[default]
    ActionCount,
    /// Hash of package and activity.
    Activity,
}

/// The action-selection strategy.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectorConfig {
    #[default]
    UniformRandom,
    Stoat {
        #[serde(default)]
        weighting: HeuristicWeighting,
    },
    Qbe {
        #[serde(default)]
        state_abstraction: StateAbstractionKind,
        /// Number of abstract states (matrix rows).
        #[serde(default = "default_abstract_states")]
        abstract_states: usize,
        /// Trained matrix; all zeros when absent.
        #[serde(default)]
        matrix: Option<QMatrix>,
        /// Online Q-learning as `(alpha, gamma)`; read-only when absent.
        #[serde(default)]
        learning: Option<(f64, f64)>,
    },
    Pipe {
        #[serde(default)]
        initial: InitialDistribution,
        #[serde(default = "default_learning_rate")]
        learning_rate: f64,
        /// `(probability, rate)` of the post-learning tree mutation.
        #[serde(default)]
        mutation: Option<(f64, f64)>,
    },
}

fn default_abstract_states() -> usize {
    10
}

fn default_learning_rate() -> f64 {
    0.1
}

/// How episodes are generated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SearchConfig {
    /// Plain exploration: independent episodes with the selector.
    #[default]
    Episodes,
    RandomSearch {
        #[serde(default = "default_archive_size")]
        archive_size: usize,
    },
    OnePlusOne,
    Genetic {
        #[serde(default = "default_population_size")]
        population_size: usize,
        #[serde(default = "default_tournament_size")]
        tournament_size: usize,
    },
    GreyBoxFuzzing {
        #[serde(default)]
        settings: FuzzingSettings,
    },
}

fn default_archive_size() -> usize {
    10
}

fn default_population_size() -> usize {
    10
}

fn default_tournament_size() -> usize {
    2
}

/// Fitness objectives; the first is primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    DistinctStates,
    DiscoveredStates,
    DistinctActions,
    Crashes,
    EpisodeLength,
}

fn default_objectives() -> Vec<Objective> {
    vec![Objective::DiscoveredStates]
}

/// Complete configuration of one exploration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorationConfig {
    /// RNG seed; worker `i` derives its streams from `seed + i`.
    pub seed: u64,
    pub equivalence: StateEquivalence,
    pub episode: EpisodeSettings,
    pub limits: ResourceLimits,
    pub selector: SelectorConfig,
    pub search: SearchConfig,
    #[serde(default = "default_objectives")]
    pub objectives: Vec<Objective>,
    pub logging: LoggingConfig,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            equivalence: StateEquivalence::default(),
            episode: EpisodeSettings::default(),
            limits: ResourceLimits::default(),
            selector: SelectorConfig::default(),
            search: SearchConfig::default(),
            objectives: default_objectives(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ExplorationConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject inconsistent settings before any component is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.equivalence.validate()?;
        if self.episode.max_length == 0 {
            return Err(invalid("episode.max_length", "must be > 0"));
        }
        if self.objectives.is_empty() {
            return Err(invalid("objectives", "at least one objective is required"));
        }

        match &self.selector {
            SelectorConfig::UniformRandom => {}
            SelectorConfig::Stoat { weighting } => weighting.validate()?,
            SelectorConfig::Qbe {
                abstract_states,
                matrix,
                learning,
                ..
            } => {
                if *abstract_states == 0 {
                    return Err(invalid("selector.abstract_states", "must be > 0"));
                }
                if let Some(matrix) = matrix {
                    matrix.check_dimensions(*abstract_states, ABSTRACT_ACTIONS)?;
                }
                if let Some((alpha, gamma)) = learning {
                    check_unit("selector.learning.alpha", *alpha, false)?;
                    check_unit("selector.learning.gamma", *gamma, true)?;
                }
            }
            SelectorConfig::Pipe {
                initial,
                learning_rate,
                mutation,
            } => {
                if let InitialDistribution::Heuristic(weighting) = initial {
                    weighting.validate()?;
                }
                check_unit("selector.learning_rate", *learning_rate, false)?;
                if let Some((probability, rate)) = mutation {
                    check_unit("selector.mutation.probability", *probability, true)?;
                    check_unit("selector.mutation.rate", *rate, true)?;
                }
            }
        }

        match &self.search {
            SearchConfig::Genetic {
                population_size,
                tournament_size,
            } => {
                if *population_size == 0 {
                    return Err(invalid("search.population_size", "must be > 0"));
                }
                if *tournament_size == 0 {
                    return Err(invalid("search.tournament_size", "must be > 0"));
                }
            }
            SearchConfig::RandomSearch { archive_size } if *archive_size == 0 => {
                return Err(invalid("search.archive_size", "must be > 0"));
            }
            SearchConfig::GreyBoxFuzzing { settings } if settings.max_energy == 0 => {
                return Err(invalid("search.settings.max_energy", "must be > 0"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// `value` must lie in `(0, 1]`, or `[0, 1]` when `allow_zero`.
fn check_unit(field: &'static str, value: f64, allow_zero: bool) -> Result<(), ConfigError> {
    let low_ok = if allow_zero { value >= 0.0 } else { value > 0.0 };
    if !value.is_finite() || !low_ok || value > 1.0 {
        let range = if allow_zero { "[0, 1]" } else { "(0, 1]" };
        return Err(invalid(field, format!("must lie in {range}, got {value}")));
    }
    Ok(())
}
