pub mod equivalence;
pub mod export;
pub mod graph;
pub mod observation;

pub use equivalence::StateEquivalence;
pub use graph::{GuiModel, LogicalState, ModelError, StateId, Transition};
pub use observation::{Action, ActionKind, Bounds, ScreenObservation, Widget};
