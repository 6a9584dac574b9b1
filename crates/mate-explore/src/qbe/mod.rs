//! Q-matrix guided exploration: abstraction functions, the matrix itself,
//! and the weighted draw used to sample abstract actions.

pub mod abstraction;
pub mod matrix;
pub mod sampling;

pub use abstraction::{
    AbstractionError, ActionAbstraction, ActionCountAbstraction, ActivityAbstraction,
    StateAbstraction, ABSTRACT_ACTIONS,
};
pub use matrix::{QMatrix, QMatrixError};
pub use sampling::{weighted_choice, SamplingError};
