//! Probabilistic prototype tree (PPT): visited states, each carrying a live
//! probability distribution over its actions.

pub mod replay;
pub mod tree;

pub use replay::{PptReplay, ReplayStep};
pub use tree::{Distribution, InitialDistribution, NodeId, Ppt, PptError, PptNode};
